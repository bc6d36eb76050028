use std::path::Path;

use anyhow::{anyhow, bail, Context};
use reqwest::StatusCode;
use tokio::fs;
use tokio::io::{self, AsyncReadExt};

use crate::config::Config;
use crate::types::api::{ErrorResponse, UploadPaste};

pub async fn run(config: &Config, file: Option<&Path>) -> anyhow::Result<()> {
    let content = match file {
        Some(path) => fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("failed to read stdin")?;
            buf
        }
    };

    let uri = post_paste(config, content).await?;
    println!("Your paste has been uploaded here:\n{uri}\nthe raw object is here: {uri}/raw");

    Ok(())
}

async fn post_paste(config: &Config, content: Vec<u8>) -> anyhow::Result<String> {
    let endpoint = format!("{base_url}paste", base_url = config.base_url);
    let response = reqwest::Client::new()
        .post(&endpoint)
        .basic_auth(
            &config.credentials.username,
            Some(&config.credentials.password),
        )
        .body(content)
        .send()
        .await
        .with_context(|| format!("request to {endpoint} failed"))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        bail!("unauthorized, check your username and password");
    }
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        bail!(
            "payload too large, make sure the server and any proxy in front of it accept \
             bodies this large"
        );
    }

    let body = response
        .bytes()
        .await
        .context("failed to read response body")?;
    parse_response(&body)
}

fn parse_response(body: &[u8]) -> anyhow::Result<String> {
    if let Ok(error) = serde_json::from_slice::<ErrorResponse>(body) {
        bail!("server responded with: {}", error.error);
    }

    serde_json::from_slice::<UploadPaste>(body)
        .map(|paste| paste.uri)
        .map_err(|_| {
            anyhow!(
                "unexpected response: {}",
                String::from_utf8_lossy(body)
            )
        })
}
