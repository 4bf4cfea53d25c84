use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::capabilities::{PhoneValidator, ValidationResult};
use crate::config::PhoneConfig;

#[derive(Debug, Deserialize)]
struct PhoneResponse {
    #[serde(default)]
    country: Option<Country>,
    #[serde(default)]
    carrier: Option<String>,
    // Older responses call this `type`
    #[serde(default, alias = "type")]
    line_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Country {
    #[serde(default)]
    name: Option<String>,
}

/// Abstract API phone validation client
pub struct PhoneClient {
    client: reqwest::Client,
    config: PhoneConfig,
}

impl PhoneClient {
    pub fn new(config: PhoneConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl PhoneValidator for PhoneClient {
    async fn validate_phone(&self, number: &str) -> Result<ValidationResult> {
        let url = format!("{}/", self.config.base_url.trim_end_matches('/'));

        debug!("Validating phone number via {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.config.api_key.as_str()), ("phone", number)])
            .send()
            .await
            .context("Failed to send phone validation request")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Phone validation API error ({}): {}",
                status,
                error_body.chars().take(200).collect::<String>()
            );
        }

        let body: PhoneResponse = response
            .json()
            .await
            .context("Failed to parse phone validation response")?;

        Ok(ValidationResult::new(
            body.country.and_then(|c| c.name),
            body.carrier,
            body.line_type,
        ))
    }
}
