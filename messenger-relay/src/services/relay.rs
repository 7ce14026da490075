//! Per-event relay flow: validate, generate, reply.

use crate::models::{IncomingPayload, MessageText, MessagingEvent, OutboundMessage, MAX_TEXT_CHARS};
use crate::services::metrics::record_event;
use crate::services::providers::{MessageSender, TextGenerator};
use std::sync::Arc;

/// Sent instead of a generation when the inference call fails.
pub const INFERENCE_FALLBACK_REPLY: &str = "Sorry, there was an error processing your message.";

/// Sent when the incoming text is not a string or is too long.
pub const REJECTED_MESSAGE_REPLY: &str = "Sorry, I can't process your message.";

/// What happened to a single messaging event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Missing sender or text; nothing was sent.
    Skipped,
    /// The apology was delivered.
    Apologized,
    /// A generated reply was delivered.
    Replied,
    /// Inference failed and the fallback reply was delivered.
    RepliedWithFallback,
    /// The Send API call failed.
    DeliveryFailed,
}

impl EventOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventOutcome::Skipped => "skipped",
            EventOutcome::Apologized => "apologized",
            EventOutcome::Replied => "replied",
            EventOutcome::RepliedWithFallback => "replied_with_fallback",
            EventOutcome::DeliveryFailed => "delivery_failed",
        }
    }
}

#[derive(Clone)]
pub struct MessageRelay {
    generator: Arc<dyn TextGenerator>,
    sender: Arc<dyn MessageSender>,
}

impl MessageRelay {
    pub fn new(generator: Arc<dyn TextGenerator>, sender: Arc<dyn MessageSender>) -> Self {
        Self { generator, sender }
    }

    /// Handle every event in the payload, one at a time, in order.
    pub async fn relay_payload(&self, payload: &IncomingPayload) -> Vec<EventOutcome> {
        let mut outcomes = Vec::new();
        for event in payload.events() {
            outcomes.push(self.relay_event(event).await);
        }
        outcomes
    }

    pub async fn relay_event(&self, event: &MessagingEvent) -> EventOutcome {
        let outcome = self.handle_event(event).await;
        record_event(outcome.as_str());
        outcome
    }

    async fn handle_event(&self, event: &MessagingEvent) -> EventOutcome {
        let text = event.text();
        let sender_id = match (event.sender_id(), &text) {
            (Some(sender_id), MessageText::Accepted(_) | MessageText::Rejected) => sender_id,
            (sender_id, _) => {
                tracing::warn!(
                    has_sender = sender_id.is_some(),
                    has_text = !matches!(text, MessageText::Absent),
                    "Incomplete message received, skipping"
                );
                return EventOutcome::Skipped;
            }
        };

        let prompt = match text {
            MessageText::Accepted(prompt) => prompt,
            _ => {
                tracing::warn!(
                    sender_id = %sender_id,
                    max_chars = MAX_TEXT_CHARS,
                    "Invalid user input, sending apology"
                );
                let reply = OutboundMessage::new(sender_id, REJECTED_MESSAGE_REPLY);
                return if self.deliver(&reply).await {
                    EventOutcome::Apologized
                } else {
                    EventOutcome::DeliveryFailed
                };
            }
        };

        let (reply_text, fell_back) = match self.generator.generate(&prompt).await {
            Ok(generated) => (generated, false),
            Err(e) => {
                tracing::error!(
                    sender_id = %sender_id,
                    error = %e,
                    "Inference call failed, using fallback reply"
                );
                (INFERENCE_FALLBACK_REPLY.to_string(), true)
            }
        };

        let reply = OutboundMessage::new(sender_id, reply_text);
        match (self.deliver(&reply).await, fell_back) {
            (false, _) => EventOutcome::DeliveryFailed,
            (true, false) => EventOutcome::Replied,
            (true, true) => EventOutcome::RepliedWithFallback,
        }
    }

    async fn deliver(&self, message: &OutboundMessage) -> bool {
        match self.sender.send(message).await {
            Ok(response) => {
                tracing::info!(
                    recipient_id = %message.recipient_id,
                    message_id = ?response.message_id,
                    "Reply sent"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    recipient_id = %message.recipient_id,
                    error = %e,
                    "Failed to send reply"
                );
                false
            }
        }
    }
}
