//! CLI Status Command
//!
//! Queries a running gateway's health endpoint.

use anyhow::{Context, Result};

use crate::config::Config;

pub async fn run(config: &Config) -> Result<()> {
    let host = match config.bind_address.as_str() {
        "0.0.0.0" | "::" => "127.0.0.1",
        other => other,
    };
    let url = format!("http://{}:{}/api/health", host, config.port);

    match reqwest::get(&url).await {
        Ok(resp) => {
            let body: serde_json::Value = resp
                .json()
                .await
                .with_context(|| format!("Unexpected health response from {url}"))?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Err(e) if e.is_connect() => {
            println!("richdoc is not running on port {} ({e})", config.port);
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to query {url}")),
    }
    Ok(())
}
