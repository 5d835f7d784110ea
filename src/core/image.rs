use crate::core::error::Result;
use std::path::Path;

const DEFAULT_FILE_NAME: &str = "photo.png";

#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub data: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(
        data: Vec<u8>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            data,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::new(data, DEFAULT_FILE_NAME, "image/png")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
        let mime_type = mime_for_extension(path).to_string();
        Ok(Self::new(data, file_name, mime_type))
    }
}

fn mime_for_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}
