use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One shop account. Owned by the registration flow; the ledger only reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub phone_number: String,
    pub business_name: String,
    pub created_at: DateTime<Utc>,
}

pub const DEFAULT_BUSINESS_NAME: &str = "My Mandi Shop";

/// Channel senders arrive as `whatsapp:+92300...`; tenants are stored by bare number.
pub fn normalize_phone_number(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("whatsapp:")
        .or_else(|| trimmed.strip_prefix("WHATSAPP:"))
        .unwrap_or(trimmed);
    without_scheme.chars().filter(|ch| !ch.is_whitespace()).collect()
}
