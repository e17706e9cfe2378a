//! OpenAI-compatible client configuration.

use crate::config::LlmSettings;
use crate::error::{Result, ScenecastError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create a client for the configured OpenAI-compatible endpoint.
///
/// The API key is read from `settings.api_key_env`. A missing key is not
/// rejected here; the first request will fail with an authentication error.
pub fn create_client(settings: &LlmSettings) -> Result<Client<OpenAIConfig>> {
    let mut config = OpenAIConfig::new().with_api_base(settings.api_base.trim_end_matches('/'));
    if let Some(key) = settings.api_key() {
        config = config.with_api_key(key);
    }

    create_client_with_timeout(config, Duration::from_secs(settings.timeout_secs))
}

/// Create a client with an explicit configuration and timeout.
pub fn create_client_with_timeout(
    config: OpenAIConfig,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ScenecastError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(config).with_http_client(http_client))
}
