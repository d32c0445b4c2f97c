//! OpenAI chat-completions client

use async_trait::async_trait;
use std::time::Duration;

use super::{validate_completion, Completion, CompletionRequest, LlmClient, LlmError};
use crate::config::OpenAiConfig;

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// `LlmClient` over the OpenAI HTTP API
pub struct OpenAiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    organization: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(LlmError::MissingApiKey)?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            organization: config.organization.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "Requesting chat completion"
        );

        let mut builder = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request);
        if let Some(organization) = &self.organization {
            builder = builder.header("OpenAI-Organization", organization);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Schema(e.to_string()))?;

        validate_completion(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_api_key() {
        assert!(matches!(
            OpenAiClient::new(&OpenAiConfig::default()),
            Err(LlmError::MissingApiKey)
        ));

        let config = OpenAiConfig {
            api_key: Some("sk-test".to_string()),
            base_url: "http://localhost:9/".to_string(),
            ..OpenAiConfig::default()
        };
        let client = OpenAiClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:9");
    }
}
