use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::tenant::TenantId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryItemId(pub i64);

impl std::fmt::Display for InventoryItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current stock for one `(tenant, item)` pair.
///
/// `id` is `None` until the store has assigned a row. `quantity` is signed:
/// overselling is recorded, not rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Option<InventoryItemId>,
    pub tenant_id: TenantId,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit: String,
}

impl InventoryItem {
    pub fn new(
        tenant_id: TenantId,
        item_name: &str,
        quantity: Decimal,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            tenant_id,
            item_name: normalize_item_name(item_name),
            quantity,
            unit: unit.into(),
        }
    }

    pub fn item_key(&self) -> String {
        item_key(&self.item_name)
    }
}

/// Partial update applied by administrative corrections outside the ledger flow.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub item_name: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.item_name.is_none() && self.quantity.is_none() && self.unit.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockAction {
    In,
    Out,
}

impl StockAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "IN" => Some(Self::In),
            "OUT" => Some(Self::Out),
            _ => None,
        }
    }

    /// `None` when the result does not fit in a `Decimal`.
    pub fn apply(&self, current: Decimal, quantity: Decimal) -> Option<Decimal> {
        match self {
            Self::In => current.checked_add(quantity),
            Self::Out => current.checked_sub(quantity),
        }
    }
}

impl std::fmt::Display for StockAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display form of an item name: trimmed, inner whitespace collapsed.
pub fn normalize_item_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uniqueness key of an item within a tenant. Case-insensitive.
pub fn item_key(raw: &str) -> String {
    normalize_item_name(raw).to_lowercase()
}
