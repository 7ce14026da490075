use messenger_relay::config::{InferenceConfig, MessengerConfig, RelayConfig};
use messenger_relay::startup::Application;
use reqwest::Client;
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_PAGE_TOKEN: &str = "test-page-token";
pub const TEST_VERIFY_TOKEN: &str = "test-verify-token";
pub const TEST_HF_TOKEN: &str = "hf_test_token";
pub const INFERENCE_PATH: &str = "/models/test-model";
pub const SEND_API_PATH: &str = "/v12.0/me/messages";

/// A running relay wired to a mock server standing in for both the
/// inference endpoint and the Send API.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub mock_server: MockServer,
    pub client: Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_timeout(10).await
    }

    pub async fn spawn_with_timeout(outbound_timeout_secs: u64) -> Self {
        let mock_server = MockServer::start().await;

        let config = RelayConfig {
            common: CoreConfig { port: 0 },
            messenger: MessengerConfig {
                page_access_token: Secret::new(TEST_PAGE_TOKEN.to_string()),
                verify_token: Some(Secret::new(TEST_VERIFY_TOKEN.to_string())),
                graph_api_base_url: format!("{}/v12.0", mock_server.uri()),
            },
            inference: InferenceConfig {
                api_url: format!("{}{}", mock_server.uri(), INFERENCE_PATH),
                token: Some(Secret::new(TEST_HF_TOKEN.to_string())),
            },
            outbound_timeout_secs,
            debug: false,
            otlp_endpoint: None,
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.http_port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            mock_server,
            client,
        }
    }

    pub async fn verify(&self, mode: &str, token: &str, challenge: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/webhook", self.address))
            .query(&[
                ("hub.mode", mode),
                ("hub.verify_token", token),
                ("hub.challenge", challenge),
            ])
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_webhook(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/webhook", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Mount an inference response for every prompt.
    pub async fn mock_inference(&self, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(INFERENCE_PATH))
            .respond_with(response)
            .mount(&self.mock_server)
            .await;
    }

    /// Mount a successful Send API response.
    pub async fn mock_send_api(&self) {
        Mock::given(method("POST"))
            .and(path(SEND_API_PATH))
            .and(query_param("access_token", TEST_PAGE_TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "recipient_id": "U1",
                "message_id": "m_test"
            })))
            .mount(&self.mock_server)
            .await;
    }

    /// Bodies of requests the mock server received on `request_path`.
    pub async fn received_bodies(&self, request_path: &str) -> Vec<Value> {
        self.mock_server
            .received_requests()
            .await
            .expect("Request recording is disabled")
            .into_iter()
            .filter(|request| request.url.path() == request_path)
            .map(|request| {
                serde_json::from_slice(&request.body).expect("Request body is not JSON")
            })
            .collect()
    }
}

/// A page delivery with one text message per `(sender, text)` pair.
pub fn page_payload(messages: &[(&str, Value)]) -> Value {
    let messaging: Vec<Value> = messages
        .iter()
        .map(|(sender, text)| json!({"sender": {"id": sender}, "message": {"text": text}}))
        .collect();

    json!({"object": "page", "entry": [{"messaging": messaging}]})
}

pub fn reply_body(recipient: &str, text: &str) -> Value {
    json!({"recipient": {"id": recipient}, "message": {"text": text}})
}
