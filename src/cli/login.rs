use anyhow::{Context, Result};
use modelplace::{CloudClient, CredentialStore, Settings};

pub async fn run(email: Option<String>, password: Option<String>) -> Result<()> {
    let settings = Settings::load()?;
    settings.validate()?;

    match (email, password) {
        (Some(email), Some(password)) => {
            CloudClient::connect_with_login(&settings, &email, &password)
                .await
                .context("Login failed")?;
        }
        _ => {
            CloudClient::connect(&settings)
                .await
                .context("Authorization failed")?;
        }
    }

    let store = CredentialStore::open_default()?;
    store.load().await?;
    if let Some(credential) = store.current().await {
        match credential.expires_at {
            Some(expires_at) => println!("Authorized, credential valid until {expires_at}"),
            None => println!("Authorized"),
        }
    }

    Ok(())
}
