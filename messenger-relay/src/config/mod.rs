use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// Send API base for the Graph API version the relay speaks.
pub const DEFAULT_GRAPH_API_BASE_URL: &str = "https://graph.facebook.com/v12.0";

/// Upper bound on each outbound call (inference and send).
pub const DEFAULT_OUTBOUND_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub messenger: MessengerConfig,
    pub inference: InferenceConfig,
    pub outbound_timeout_secs: u64,
    /// Verbose logging when run standalone.
    pub debug: bool,
    /// OpenTelemetry collector; traces are only exported when set.
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessengerConfig {
    pub page_access_token: Secret<String>,
    /// Without it the subscription handshake never succeeds.
    pub verify_token: Option<Secret<String>>,
    pub graph_api_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    pub api_url: String,
    pub token: Option<Secret<String>>,
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        Self::from_lookup(common_config, |key| env::var(key).ok())
    }

    /// Build the relay settings from any key/value source.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|val| !val.is_empty());

        Ok(RelayConfig {
            common,
            messenger: MessengerConfig {
                page_access_token: Secret::new(require(&get, "PAGE_ACCESS_TOKEN")?),
                verify_token: get("VERIFY_TOKEN").map(Secret::new),
                graph_api_base_url: get("GRAPH_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE_URL.to_string()),
            },
            inference: InferenceConfig {
                api_url: require(&get, "HUGGINGFACE_API_URL")?,
                token: get("HUGGINGFACE_TOKEN").map(Secret::new),
            },
            outbound_timeout_secs: get("OUTBOUND_TIMEOUT_SECS")
                .and_then(|val| val.parse().ok())
                .unwrap_or(DEFAULT_OUTBOUND_TIMEOUT_SECS),
            debug: get("DEBUG").map(|val| is_truthy(&val)).unwrap_or(false),
            otlp_endpoint: get("OTLP_ENDPOINT"),
        })
    }

    pub fn outbound_timeout(&self) -> Duration {
        Duration::from_secs(self.outbound_timeout_secs)
    }

    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

fn require<F>(get: &F, key: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    get(key).ok_or_else(|| {
        AppError::ConfigError(anyhow::anyhow!("{} is required but not set", key))
    })
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
