use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::inventory::StockAction;
use crate::domain::tenant::TenantId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Purchase,
    Sale,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "PURCHASE",
            Self::Sale => "SALE",
            Self::Adjustment => "ADJUSTMENT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PURCHASE" => Some(Self::Purchase),
            "SALE" => Some(Self::Sale),
            "ADJUSTMENT" => Some(Self::Adjustment),
            _ => None,
        }
    }

    /// Purchases bring stock in; everything else moves it out.
    pub fn stock_action(&self) -> StockAction {
        match self {
            Self::Purchase => StockAction::In,
            Self::Sale | Self::Adjustment => StockAction::Out,
        }
    }
}

/// A transaction before the store has assigned its id and timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub tenant_id: TenantId,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub transaction_type: TransactionType,
    pub rate: Option<Decimal>,
    pub total_amount: Decimal,
    pub buyer_name: Option<String>,
    pub is_credit: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub tenant_id: TenantId,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub transaction_type: TransactionType,
    pub rate: Option<Decimal>,
    pub total_amount: Decimal,
    pub buyer_name: Option<String>,
    pub is_credit: bool,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn from_new(id: TransactionId, new: NewTransaction, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            tenant_id: new.tenant_id,
            item_name: new.item_name,
            quantity: new.quantity,
            unit: new.unit,
            transaction_type: new.transaction_type,
            rate: new.rate,
            total_amount: new.total_amount,
            buyer_name: new.buyer_name,
            is_credit: new.is_credit,
            created_at,
        }
    }
}

/// Correction of a recorded transaction (e.g. a misheard rate or buyer name).
///
/// `rate` and `buyer_name` use a nested option so a correction can clear them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPatch {
    pub item_name: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub rate: Option<Option<Decimal>>,
    pub total_amount: Option<Decimal>,
    pub buyer_name: Option<Option<String>>,
    pub is_credit: Option<bool>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self.item_name.is_none()
            && self.quantity.is_none()
            && self.unit.is_none()
            && self.rate.is_none()
            && self.total_amount.is_none()
            && self.buyer_name.is_none()
            && self.is_credit.is_none()
    }
}

/// `quantity x rate`, or zero when no rate was given. `None` on overflow.
pub fn total_amount(quantity: Decimal, rate: Option<Decimal>) -> Option<Decimal> {
    match rate {
        Some(rate) => quantity.checked_mul(rate),
        None => Some(Decimal::ZERO),
    }
}
