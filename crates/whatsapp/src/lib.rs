//! WhatsApp channel (Twilio) - webhook payloads in, TwiML out
//!
//! - **Events** (`events`) - the form Twilio posts per inbound message, narrowed
//!   to one sender and at most one voice note or photo
//! - **Replies** (`reply`) - TwiML documents carrying the confirmation text
//!
//! # Flow
//!
//! ```text
//! Twilio form POST -> TwilioWebhookForm -> InboundMessage -> Agent Runtime
//!                                                              |
//!                         TwimlReply <- confirmation text <----+
//! ```
//!
//! Signature validation and media download are not handled here.

pub mod events;
pub mod reply;

pub use events::{InboundMedia, InboundMessage, MediaKind, TwilioWebhookForm, WebhookParseError};
pub use reply::{TwimlReply, TWIML_CONTENT_TYPE};
