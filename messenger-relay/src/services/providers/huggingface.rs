//! Hugging Face Inference API provider.
//!
//! Sends `{"inputs": text}` to the configured model URL and reads
//! `generated_text` from the first returned generation.

use super::{build_client, ProviderError, TextGenerator};
use crate::config::InferenceConfig;
use crate::services::metrics::record_provider_call;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::observability::TracedClientExt;
use std::time::Duration;

const PROVIDER: &str = "huggingface";

/// Reply used when the model answers without a `generated_text` field.
pub const NO_GENERATION_REPLY: &str = "Sorry, I couldn't generate a response.";

pub struct HuggingFaceProvider {
    config: InferenceConfig,
    client: Client,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct Generation {
    #[serde(default)]
    generated_text: Option<String>,
}

impl HuggingFaceProvider {
    pub fn new(config: InferenceConfig, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            config,
            client: build_client(timeout)?,
            timeout,
        })
    }

    async fn call(&self, prompt: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .traced_post(&self.config.api_url)
            .json(&InferenceRequest { inputs: prompt })
            .optional_bearer_auth(self.config.token.as_ref().map(|t| t.expose_secret()))
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let generations: Vec<Generation> = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse generations: {}", e))
        })?;

        let first = generations.into_iter().next().ok_or_else(|| {
            ProviderError::InvalidResponse("Model returned no generations".to_string())
        })?;

        Ok(first
            .generated_text
            .unwrap_or_else(|| NO_GENERATION_REPLY.to_string()))
    }
}

#[async_trait]
impl TextGenerator for HuggingFaceProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        tracing::debug!(
            prompt_len = prompt.chars().count(),
            authenticated = self.config.token.is_some(),
            "Sending request to inference endpoint"
        );

        match self.call(prompt).await {
            Ok(text) => {
                record_provider_call(PROVIDER, "success");
                Ok(text)
            }
            Err(e) => {
                record_provider_call(PROVIDER, "error");
                Err(e)
            }
        }
    }
}
