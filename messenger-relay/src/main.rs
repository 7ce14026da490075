use messenger_relay::config::RelayConfig;
use messenger_relay::services::init_metrics;
use messenger_relay::startup::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = RelayConfig::load();

    let (log_level, otlp_endpoint) = match &config {
        Ok(config) => (config.log_level(), config.otlp_endpoint.as_deref()),
        Err(_) => ("info", None),
    };
    init_tracing("messenger-relay", log_level, otlp_endpoint);

    init_metrics();

    let config = config.map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    application.run_until_stopped().await
}
