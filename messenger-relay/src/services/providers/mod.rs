//! Outbound API providers.
//!
//! The relay talks to two third parties: a text-generation endpoint and the
//! Messenger Send API. Both sit behind traits so the intake flow can be
//! exercised without the network.

pub mod graph;
pub mod huggingface;

use crate::models::OutboundMessage;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use graph::GraphApiSender;
pub use huggingface::{HuggingFaceProvider, NO_GENERATION_REPLY};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Classify a transport error. The URL is stripped so query-string
    /// credentials never reach the logs.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(timeout)
        } else {
            ProviderError::Network(err.without_url().to_string())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderResponse {
    pub message_id: Option<String>,
}

/// Turns user text into a reply.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Delivers a reply to a platform user.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<ProviderResponse, ProviderError>;
}

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Configuration(format!("Failed to create HTTP client: {}", e)))
}
