use crate::intent::{ExtractedIntent, IntentEnvelope};
use crate::router::{display_quantity, RouterResult};

/// Sent when nothing better can be said. Urdu first, English second.
pub const FALLBACK_REPLY: &str =
    "Maaf kijiye, samajh nahi aaya. Dobara bhejein. (Sorry, I could not understand. Please repeat.)";

/// Builds the confirmation text for one processed message. Never empty.
pub fn compose_reply(envelope: &IntentEnvelope, result: &RouterResult) -> String {
    let base = envelope
        .summary_for_user
        .as_deref()
        .map(str::trim)
        .filter(|summary| !summary.is_empty())
        .map(str::to_string)
        .or_else(|| movement_template(&envelope.intent))
        .or_else(|| query_answer(&envelope.intent, result))
        .unwrap_or_else(|| FALLBACK_REPLY.to_string());

    if result.is_success() {
        base
    } else {
        format!("{base} (System error: {})", result.message)
    }
}

fn movement_template(intent: &ExtractedIntent) -> Option<String> {
    let (item_name, quantity, unit, action) = match intent {
        ExtractedIntent::Update(update) => (
            update.item_name.as_deref(),
            update.quantity,
            update.unit.as_deref(),
            update.action.as_deref().map(str::to_ascii_uppercase),
        ),
        ExtractedIntent::Sale(sale) => {
            (sale.item_name.as_deref(), sale.quantity, sale.unit.as_deref(), Some("OUT".to_string()))
        }
        ExtractedIntent::Query(_) | ExtractedIntent::Unknown { .. } => return None,
    };

    let quantity = quantity.map(display_quantity);
    let parts = [item_name, quantity.as_deref(), unit, action.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>();

    Some(if parts.is_empty() { "Done".to_string() } else { format!("Done: {}", parts.join(" ")) })
}

fn query_answer(intent: &ExtractedIntent, result: &RouterResult) -> Option<String> {
    (matches!(intent, ExtractedIntent::Query(_)) && result.is_success()).then(|| result.message.clone())
}
