use super::{build_client, MessageSender, ProviderError, ProviderResponse};
use crate::config::MessengerConfig;
use crate::models::{OutboundMessage, SendMessageRequest, SendMessageResponse};
use crate::services::metrics::record_provider_call;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use service_core::observability::TracedClientExt;
use std::time::Duration;

const PROVIDER: &str = "messenger";

/// Messenger Send API client, authenticated with the page access token.
pub struct GraphApiSender {
    config: MessengerConfig,
    client: Client,
    timeout: Duration,
}

impl GraphApiSender {
    pub fn new(config: MessengerConfig, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            config,
            client: build_client(timeout)?,
            timeout,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/me/messages",
            self.config.graph_api_base_url.trim_end_matches('/')
        )
    }

    async fn call(&self, message: &OutboundMessage) -> Result<ProviderResponse, ProviderError> {
        let response = self
            .client
            .traced_post(&self.messages_url())
            .query(&[("access_token", self.config.page_access_token.expose_secret())])
            .header("Content-Type", "application/json")
            .json(&SendMessageRequest::from(message))
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

        // The body only carries identifiers; a 2xx is delivery either way.
        let message_id = response
            .json::<SendMessageResponse>()
            .await
            .ok()
            .and_then(|body| body.message_id);

        Ok(ProviderResponse { message_id })
    }
}

#[async_trait]
impl MessageSender for GraphApiSender {
    async fn send(&self, message: &OutboundMessage) -> Result<ProviderResponse, ProviderError> {
        match self.call(message).await {
            Ok(response) => {
                record_provider_call(PROVIDER, "success");
                Ok(response)
            }
            Err(e) => {
                record_provider_call(PROVIDER, "error");
                Err(e)
            }
        }
    }
}
