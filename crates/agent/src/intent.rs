//! Decoding of the model's JSON into a closed intent type.
//!
//! The payload is semi-trusted: every field may be absent, null, or of an
//! unexpected type. Decoding never fails once the text is JSON; odd fields
//! simply become `None`.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StockUpdateIntent {
    pub item_name: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    /// Raw action text; validated by the router so a bad value stays visible.
    pub action: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaleIntent {
    pub item_name: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub rate: Option<Decimal>,
    pub buyer_name: Option<String>,
    pub is_credit: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryIntent {
    pub item_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtractedIntent {
    Update(StockUpdateIntent),
    Sale(SaleIntent),
    Query(QueryIntent),
    /// Missing or unrecognized tag. `tag` keeps what the model sent, if anything.
    Unknown { tag: Option<String> },
}

impl ExtractedIntent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Update(_) => "UPDATE",
            Self::Sale(_) => "SALE",
            Self::Query(_) => "QUERY",
            Self::Unknown { .. } => "UNKNOWN",
        }
    }

    pub fn item_name(&self) -> Option<&str> {
        match self {
            Self::Update(intent) => intent.item_name.as_deref(),
            Self::Sale(intent) => intent.item_name.as_deref(),
            Self::Query(intent) => intent.item_name.as_deref(),
            Self::Unknown { .. } => None,
        }
    }
}

/// An intent plus the free-text fields the model attaches to any variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentEnvelope {
    pub intent: ExtractedIntent,
    pub summary_for_user: Option<String>,
    pub original_text: Option<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntentParseError {
    #[error("model returned an empty response")]
    Empty,
    #[error("model response is not JSON: {0}")]
    NotJson(String),
}

impl IntentEnvelope {
    pub fn unknown() -> Self {
        Self { intent: ExtractedIntent::Unknown { tag: None }, summary_for_user: None, original_text: None }
    }

    /// Parses raw model output, tolerating a fenced block or prose around the object.
    pub fn parse(raw: &str) -> Result<Self, IntentParseError> {
        let stripped = strip_code_fences(raw);
        if stripped.is_empty() {
            return Err(IntentParseError::Empty);
        }

        let value = match serde_json::from_str::<Value>(stripped) {
            Ok(value) => value,
            Err(error) => match embedded_object(stripped) {
                Some(object) => serde_json::from_str::<Value>(object)
                    .map_err(|_| IntentParseError::NotJson(error.to_string()))?,
                None => return Err(IntentParseError::NotJson(error.to_string())),
            },
        };

        Ok(Self::from_value(&value))
    }

    /// Never fails: a non-object decodes as an unknown intent with no fields.
    pub fn from_value(value: &Value) -> Self {
        let Some(fields) = value.as_object() else {
            return Self::unknown();
        };

        let tag = text(fields, "intent");
        let intent = match tag.as_deref().map(str::to_ascii_uppercase).as_deref() {
            Some("UPDATE") => ExtractedIntent::Update(StockUpdateIntent {
                item_name: text(fields, "item_name"),
                quantity: decimal(fields, "quantity"),
                unit: text(fields, "unit"),
                action: text(fields, "action"),
            }),
            Some("SALE") => ExtractedIntent::Sale(SaleIntent {
                item_name: text(fields, "item_name"),
                quantity: decimal(fields, "quantity"),
                unit: text(fields, "unit"),
                rate: decimal(fields, "rate"),
                buyer_name: text(fields, "buyer_name"),
                is_credit: flag(fields, "is_credit").unwrap_or(false),
            }),
            Some("QUERY") => ExtractedIntent::Query(QueryIntent { item_name: text(fields, "item_name") }),
            _ => ExtractedIntent::Unknown { tag },
        };

        Self {
            intent,
            summary_for_user: text(fields, "summary_for_user"),
            original_text: text(fields, "original_text"),
        }
    }
}

/// Removes a surrounding ```json ... ``` fence if the model added one.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|ch: char| ch.is_ascii_alphabetic()),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn embedded_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(value) => {
            let trimmed = value.trim();
            (!trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("null")).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn decimal(fields: &Map<String, Value>, key: &str) -> Option<Decimal> {
    let raw = match fields.get(key)? {
        Value::Number(number) => number.to_string(),
        Value::String(value) => value.trim().replace(',', ""),
        _ => return None,
    };
    Decimal::from_str(&raw).or_else(|_| Decimal::from_scientific(&raw)).ok()
}

fn flag(fields: &Map<String, Value>, key: &str) -> Option<bool> {
    match fields.get(key)? {
        Value::Bool(value) => Some(*value),
        Value::Number(number) => number.as_i64().map(|value| value != 0),
        Value::String(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{strip_code_fences, ExtractedIntent, IntentEnvelope, IntentParseError};

    #[test]
    fn update_payload_decodes_all_fields() {
        let envelope = IntentEnvelope::from_value(&json!({
            "intent": "UPDATE",
            "item_name": "Tomato",
            "quantity": 50,
            "unit": "kg",
            "action": "IN",
            "summary_for_user": "50 kg tamatar add ho gaye",
            "original_text": "pachas kilo tamatar aaye hain"
        }));

        let ExtractedIntent::Update(update) = &envelope.intent else {
            panic!("expected update, got {:?}", envelope.intent);
        };
        assert_eq!(update.item_name.as_deref(), Some("Tomato"));
        assert_eq!(update.quantity, Some(Decimal::new(50, 0)));
        assert_eq!(update.action.as_deref(), Some("IN"));
        assert_eq!(envelope.summary_for_user.as_deref(), Some("50 kg tamatar add ho gaye"));
    }

    #[test]
    fn sale_payload_accepts_numeric_strings_and_defaults_credit() {
        let envelope = IntentEnvelope::from_value(&json!({
            "intent": "sale",
            "item_name": "Tomato",
            "quantity": "35",
            "rate": "200.00",
            "buyer_name": "Imam",
            "is_credit": null
        }));

        let ExtractedIntent::Sale(sale) = envelope.intent else {
            panic!("expected sale");
        };
        assert_eq!(sale.quantity, Some(Decimal::new(35, 0)));
        assert_eq!(sale.rate, Some(Decimal::new(20000, 2)));
        assert!(!sale.is_credit);
        assert_eq!(sale.unit, None);
    }

    #[test]
    fn odd_field_types_become_none_instead_of_failing() {
        let envelope = IntentEnvelope::from_value(&json!({
            "intent": "UPDATE",
            "item_name": ["Tomato"],
            "quantity": {"value": 3},
            "unit": null,
            "action": true
        }));

        assert_eq!(
            envelope.intent,
            ExtractedIntent::Update(super::StockUpdateIntent {
                item_name: None,
                quantity: None,
                unit: None,
                action: None,
            })
        );
    }

    #[test]
    fn missing_or_unrecognized_tag_is_unknown() {
        assert_eq!(
            IntentEnvelope::from_value(&json!({"item_name": "Tomato"})).intent,
            ExtractedIntent::Unknown { tag: None }
        );
        assert_eq!(
            IntentEnvelope::from_value(&json!({"intent": "REFUND"})).intent,
            ExtractedIntent::Unknown { tag: Some("REFUND".to_string()) }
        );
        assert_eq!(IntentEnvelope::from_value(&json!([1, 2])), IntentEnvelope::unknown());
    }

    #[test]
    fn fenced_model_output_is_unwrapped() {
        let raw = "```json\n{\"intent\": \"QUERY\", \"item_name\": \"Onion\"}\n```";
        assert_eq!(strip_code_fences(raw), "{\"intent\": \"QUERY\", \"item_name\": \"Onion\"}");

        let envelope = IntentEnvelope::parse(raw).expect("parse");
        assert_eq!(envelope.intent.kind(), "QUERY");
        assert_eq!(envelope.intent.item_name(), Some("Onion"));
    }

    #[test]
    fn prose_around_the_object_is_tolerated() {
        let raw = "Here is the JSON: {\"intent\": \"QUERY\", \"item_name\": \"Garlic\"} Thanks!";
        let envelope = IntentEnvelope::parse(raw).expect("parse");
        assert_eq!(envelope.intent.item_name(), Some("Garlic"));
    }

    #[test]
    fn non_json_output_is_a_parse_error() {
        assert!(matches!(IntentEnvelope::parse("sorry, I cannot help"), Err(IntentParseError::NotJson(_))));
        assert_eq!(IntentEnvelope::parse("  ``` ```  "), Err(IntentParseError::Empty));
    }
}
