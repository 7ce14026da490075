//! Messenger Platform webhook payloads and Send API bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Discriminator value for page subscriptions.
pub const PAGE_OBJECT: &str = "page";

/// Longest message, in characters, the relay forwards for inference.
pub const MAX_TEXT_CHARS: u64 = 500;

/// Top-level webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

impl IncomingPayload {
    pub fn is_page(&self) -> bool {
        self.object.as_deref() == Some(PAGE_OBJECT)
    }

    /// All messaging events across entries, in delivery order.
    pub fn events(&self) -> impl Iterator<Item = &MessagingEvent> {
        self.entry.iter().flat_map(|entry| entry.messaging.iter())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

/// One inbound messaging unit. Delivery and read receipts arrive without a
/// `message`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagingEvent {
    #[serde(default)]
    pub sender: Option<Participant>,
    #[serde(default)]
    pub message: Option<InboundMessage>,
}

/// Ids are kept loose so one odd event cannot fail the whole delivery.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub id: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMessage {
    /// Kept loose so non-string text can be told apart from absent text.
    #[serde(default)]
    pub text: Option<Value>,
}

/// Text that passed validation and may be sent for inference.
#[derive(Debug, Clone, Validate)]
pub struct InboundText {
    #[validate(length(min = 1, max = MAX_TEXT_CHARS))]
    pub body: String,
}

/// How an event's text should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageText {
    /// Missing or empty; the event is skipped.
    Absent,
    /// Not a string, or too long; the user gets an apology.
    Rejected,
    Accepted(String),
}

impl MessagingEvent {
    pub fn sender_id(&self) -> Option<&str> {
        self.sender
            .as_ref()
            .and_then(|sender| sender.id.as_ref())
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn text(&self) -> MessageText {
        let value = match self.message.as_ref().and_then(|m| m.text.as_ref()) {
            Some(value) if !is_empty_value(value) => value,
            _ => return MessageText::Absent,
        };

        match value {
            Value::String(body) => {
                let text = InboundText { body: body.clone() };
                if text.validate().is_ok() {
                    MessageText::Accepted(text.body)
                } else {
                    MessageText::Rejected
                }
            }
            _ => MessageText::Rejected,
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// A reply to deliver through the Send API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub recipient_id: String,
    pub text: String,
}

impl OutboundMessage {
    pub fn new(recipient_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            text: text.into(),
        }
    }
}

/// Send API request body.
#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub recipient: Recipient<'a>,
    pub message: MessageBody<'a>,
}

#[derive(Debug, Serialize)]
pub struct Recipient<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct MessageBody<'a> {
    pub text: &'a str,
}

impl<'a> From<&'a OutboundMessage> for SendMessageRequest<'a> {
    fn from(message: &'a OutboundMessage) -> Self {
        Self {
            recipient: Recipient {
                id: &message.recipient_id,
            },
            message: MessageBody {
                text: &message.text,
            },
        }
    }
}

/// Send API success body.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}
