pub mod metrics;
pub mod providers;
pub mod relay;

pub use metrics::{get_metrics, init_metrics, record_event, record_provider_call};
pub use providers::{
    GraphApiSender, HuggingFaceProvider, MessageSender, ProviderError, ProviderResponse,
    TextGenerator, NO_GENERATION_REPLY,
};
pub use relay::{EventOutcome, MessageRelay, INFERENCE_FALLBACK_REPLY, REJECTED_MESSAGE_REPLY};
