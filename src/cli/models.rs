use anyhow::{Context, Result};
use modelplace::{CloudClient, Settings};

pub async fn run(json: bool) -> Result<()> {
    let settings = Settings::load()?;
    settings.validate()?;

    let client = CloudClient::connect(&settings)
        .await
        .context("Failed to connect to the API")?;

    let page = client.models().await.context("Failed to fetch models")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        for model in &page.items {
            println!("{:>6}  {}", model.id, model.short_model_name);
        }
        println!();
        println!("{} models available", page.total);
    }

    Ok(())
}
