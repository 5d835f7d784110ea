use anyhow::{Context, Result};
use modelplace::{CloudClient, ImagePayload, Settings};
use std::path::Path;

pub async fn run(image: &Path, model_id: i64, visualize: bool, json: bool) -> Result<()> {
    let settings = Settings::load()?;
    settings.validate()?;

    let client = CloudClient::connect(&settings)
        .await
        .context("Failed to connect to the API")?;

    let payload = ImagePayload::from_path(image)
        .with_context(|| format!("Failed to read image: {}", image.display()))?;

    tracing::info!(path = ?image, model_id, "Submitting image");
    let task = client
        .submit(model_id, &payload)
        .await
        .context("Submission failed")?;
    tracing::info!(task_id = %task.task_id, "Task created");

    let poller = client.poller();
    let mut subscription = poller.watch(&task.task_id, visualize).await;

    let mut progress = subscription.progress();
    let task_id = task.task_id.clone();
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let status = progress.borrow_and_update().status.clone();
            tracing::info!(task_id = %task_id, status = %status, "Polling");
        }
    });

    let result = subscription.wait().await.context("Task did not complete")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Status: {}", result.status);
        if let Some(status) = &result.visualization_status {
            println!("Visualization status: {status}");
        }
        if let Some(url) = &result.visualization {
            println!("Visualization: {url}");
        }
    }

    Ok(())
}
