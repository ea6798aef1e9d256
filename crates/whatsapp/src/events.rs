use serde::Deserialize;
use thiserror::Error;

use mandi_core::domain::tenant::normalize_phone_number;

/// Fields of Twilio's inbound-message webhook that the pipeline reads.
/// Twilio sends many more; they are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TwilioWebhookForm {
    #[serde(rename = "From", default)]
    pub from: Option<String>,
    #[serde(rename = "MediaUrl0", default)]
    pub media_url: Option<String>,
    #[serde(rename = "MediaContentType0", default)]
    pub media_content_type: Option<String>,
    #[serde(rename = "Body", default)]
    pub body: Option<String>,
    #[serde(rename = "MessageSid", default)]
    pub message_sid: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    /// Voice note.
    Audio,
    /// Photo, usually a handwritten receipt.
    Image,
}

impl MediaKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        if essence.starts_with("audio/") {
            Some(Self::Audio)
        } else if essence.starts_with("image/") {
            Some(Self::Image)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Image => "image",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMedia {
    pub url: String,
    pub content_type: String,
    pub kind: MediaKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub message_sid: Option<String>,
    /// Bare phone number, `whatsapp:` prefix removed.
    pub sender: String,
    pub media: InboundMedia,
    pub body: Option<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WebhookParseError {
    #[error("webhook form has no sender")]
    MissingSender,
    #[error("message carries no voice note or photo (content type: {content_type:?})")]
    NotMedia { content_type: Option<String> },
}

impl InboundMessage {
    pub fn from_form(form: TwilioWebhookForm) -> Result<Self, WebhookParseError> {
        let sender = form
            .from
            .as_deref()
            .map(normalize_phone_number)
            .filter(|sender| !sender.is_empty())
            .ok_or(WebhookParseError::MissingSender)?;

        let url = form.media_url.filter(|url| !url.trim().is_empty());
        let content_type = form.media_content_type.filter(|value| !value.trim().is_empty());
        let (url, content_type, kind) = match (url, content_type) {
            (Some(url), Some(content_type)) => match MediaKind::from_content_type(&content_type) {
                Some(kind) => (url, content_type, kind),
                None => return Err(WebhookParseError::NotMedia { content_type: Some(content_type) }),
            },
            (_, content_type) => return Err(WebhookParseError::NotMedia { content_type }),
        };

        Ok(Self {
            message_sid: form.message_sid.filter(|sid| !sid.is_empty()),
            sender,
            media: InboundMedia { url, content_type, kind },
            body: form.body.filter(|body| !body.trim().is_empty()),
        })
    }
}
