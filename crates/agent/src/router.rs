use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use mandi_core::domain::inventory::{normalize_item_name, StockAction};
use mandi_core::domain::tenant::TenantId;
use mandi_core::domain::transaction::TransactionType;
use mandi_core::errors::DomainError;
use mandi_core::ledger::{InventoryLedger, LedgerError, RecordTransaction};

use crate::intent::{ExtractedIntent, QueryIntent, SaleIntent, StockUpdateIntent};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    Success,
    Error,
}

/// Outcome of routing one intent. Serializes to the shape the channel layer
/// and the reply composer read: `{status, message, new_qty?, total_amount?}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RouterResult {
    pub status: RouteStatus,
    pub message: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub new_qty: Option<Decimal>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub total_amount: Option<Decimal>,
}

impl RouterResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self { status: RouteStatus::Success, message: message.into(), new_qty: None, total_amount: None }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { status: RouteStatus::Error, message: message.into(), new_qty: None, total_amount: None }
    }

    pub fn with_new_qty(mut self, new_qty: Decimal) -> Self {
        self.new_qty = Some(new_qty);
        self
    }

    pub fn with_total_amount(mut self, total_amount: Decimal) -> Self {
        self.total_amount = Some(total_amount);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == RouteStatus::Success
    }
}

impl From<DomainError> for RouterResult {
    fn from(error: DomainError) -> Self {
        Self::failure(error.to_string())
    }
}

impl From<LedgerError> for RouterResult {
    /// Carries `new_qty` only when the store was left at a quantity the caller
    /// did not start from.
    fn from(error: LedgerError) -> Self {
        let applied = error.applied_quantity();
        let result = Self::failure(error.to_string());
        match applied {
            Some(new_qty) => result.with_new_qty(new_qty),
            None => result,
        }
    }
}

/// Renders a quantity without trailing zeros (`50.0` -> `50`).
pub fn display_quantity(quantity: Decimal) -> String {
    quantity.normalize().to_string()
}

fn join_present(parts: &[&str]) -> String {
    parts.iter().filter(|part| !part.is_empty()).copied().collect::<Vec<_>>().join(" ")
}

/// Deterministic dispatch from an extracted intent to ledger operations.
#[derive(Clone)]
pub struct IntentRouter {
    ledger: InventoryLedger,
}

impl IntentRouter {
    pub fn new(ledger: InventoryLedger) -> Self {
        Self { ledger }
    }

    pub async fn route(&self, tenant_id: &TenantId, intent: &ExtractedIntent) -> RouterResult {
        let result = match intent {
            ExtractedIntent::Update(update) => self.route_update(tenant_id, update).await,
            ExtractedIntent::Sale(sale) => self.route_sale(tenant_id, sale).await,
            ExtractedIntent::Query(query) => self.route_query(tenant_id, query).await,
            ExtractedIntent::Unknown { .. } => Err(DomainError::UnknownIntent.into()),
        };
        let result = result.unwrap_or_else(|failure| failure);

        if result.is_success() {
            info!(
                event_name = "agent.router.routed",
                tenant_id = %tenant_id,
                intent = intent.kind(),
                "intent routed"
            );
        } else {
            warn!(
                event_name = "agent.router.rejected",
                tenant_id = %tenant_id,
                intent = intent.kind(),
                reason = %result.message,
                "intent not applied"
            );
        }
        result
    }

    async fn route_update(
        &self,
        tenant_id: &TenantId,
        update: &StockUpdateIntent,
    ) -> Result<RouterResult, RouterResult> {
        let item_name = required_item_name(update.item_name.as_deref())?;
        let action = match update.action.as_deref() {
            None => return Err(DomainError::MissingStockAction.into()),
            Some(raw) => StockAction::parse(raw)
                .ok_or_else(|| DomainError::UnknownStockAction(raw.to_string()))?,
        };
        let quantity = non_negative(update.quantity)?;

        let item = self
            .ledger
            .adjust_stock(tenant_id, &item_name, quantity, update.unit.as_deref(), action)
            .await?;

        let quantity_text = display_quantity(item.quantity);
        Ok(RouterResult::success(format!(
            "Updated {item_name}. New Quantity: {}",
            join_present(&[quantity_text.as_str(), item.unit.as_str()])
        ))
        .with_new_qty(item.quantity))
    }

    async fn route_sale(
        &self,
        tenant_id: &TenantId,
        sale: &SaleIntent,
    ) -> Result<RouterResult, RouterResult> {
        let item_name = required_item_name(sale.item_name.as_deref())?;
        let quantity = non_negative(sale.quantity)?;

        let recorded = self
            .ledger
            .record_transaction(RecordTransaction {
                tenant_id: tenant_id.clone(),
                item_name: item_name.clone(),
                quantity,
                unit: sale.unit.clone(),
                transaction_type: TransactionType::Sale,
                rate: sale.rate,
                buyer_name: sale.buyer_name.clone(),
                is_credit: sale.is_credit,
            })
            .await?;

        let new_qty = display_quantity(recorded.new_quantity);
        let unit = sale.unit.as_deref().unwrap_or_default();
        Ok(RouterResult::success(format!(
            "Sold {item_name}. New Quantity: {}. Total: {}",
            join_present(&[new_qty.as_str(), unit]),
            display_quantity(recorded.total_amount)
        ))
        .with_new_qty(recorded.new_quantity)
        .with_total_amount(recorded.total_amount))
    }

    async fn route_query(
        &self,
        tenant_id: &TenantId,
        query: &QueryIntent,
    ) -> Result<RouterResult, RouterResult> {
        let item_name = required_item_name(query.item_name.as_deref())?;

        match self.ledger.current_stock(tenant_id, &item_name).await? {
            Some(item) => {
                let quantity = display_quantity(item.quantity);
                Ok(RouterResult::success(format!(
                    "We have {} of {}.",
                    join_present(&[quantity.as_str(), item.unit.as_str()]),
                    item.item_name
                ))
                .with_new_qty(item.quantity))
            }
            None => Ok(RouterResult::success(format!("No record found for {item_name}."))),
        }
    }
}

fn required_item_name(raw: Option<&str>) -> Result<String, DomainError> {
    raw.map(normalize_item_name).filter(|name| !name.is_empty()).ok_or(DomainError::MissingItemName)
}

fn non_negative(quantity: Option<Decimal>) -> Result<Decimal, DomainError> {
    let quantity = quantity.unwrap_or(Decimal::ZERO);
    if quantity < Decimal::ZERO {
        return Err(DomainError::NegativeQuantity);
    }
    Ok(quantity)
}
