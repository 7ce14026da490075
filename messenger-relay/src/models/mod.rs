pub mod webhook;

pub use webhook::{
    Entry, IncomingPayload, MessageText, MessagingEvent, OutboundMessage, SendMessageRequest,
    SendMessageResponse, MAX_TEXT_CHARS, PAGE_OBJECT,
};
