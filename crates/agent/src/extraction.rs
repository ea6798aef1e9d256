use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Instruction sent to the multimodal model alongside the media bytes.
pub const EXTRACTION_PROMPT: &str = r#"You are the bookkeeper for a small wholesale vegetable and grain trader in a South Asian market.
The attached voice note or photo is in Urdu, Hindi, Punjabi or English. Work out what the trader wants and
answer with ONE JSON object and nothing else (no markdown, no commentary).

Intents:
- "UPDATE": stock moved in or out without a sale. Fields: item_name, quantity, unit, action ("IN" or "OUT").
- "SALE": goods sold to a buyer. Fields: item_name, quantity, unit, rate (price per unit),
  buyer_name, is_credit (true when the buyer will pay later / "udhaar").
- "QUERY": the trader asks how much of an item is in stock. Fields: item_name.
- "UNKNOWN": anything else.

Common units: kg, mun (maund), sack, bori, crate. Numbers must be JSON numbers, not words.
Use English item names when obvious (tamatar -> Tomato, pyaaz -> Onion, aloo -> Potato).
Use null for any field that was not mentioned.

Always include:
- "intent": one of UPDATE, SALE, QUERY, UNKNOWN
- "original_text": a transcription of what was said or written
- "summary_for_user": a short confirmation in the trader's language (Roman Urdu is fine)

Example:
{"intent": "SALE", "item_name": "Tomato", "quantity": 35, "unit": "kg", "rate": 200,
 "buyer_name": "Imam", "is_credit": true, "action": null,
 "original_text": "Imam ko 35 kilo tamatar 200 ke rate pe udhaar diye",
 "summary_for_user": "Imam ko 35 kg tamatar udhaar becha, total 7000"}"#;

/// Media pointer received from the messaging provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaAttachment {
    pub url: String,
    pub content_type: String,
}

impl MediaAttachment {
    pub fn new(url: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self { url: url.into(), content_type: content_type.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("media download failed: {0}")]
    Download(String),
    #[error("model request failed: {0}")]
    Model(String),
    #[error("model returned no text")]
    EmptyResponse,
    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),
}

/// Turns a media attachment into the model's raw JSON text.
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn extract(&self, media: &MediaAttachment) -> Result<String, ExtractionError>;
}
