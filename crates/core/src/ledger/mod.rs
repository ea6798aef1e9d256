//! Inventory ledger: current stock per item plus the append-only transaction log.
//!
//! All mutations for one `(tenant, item)` pair run under that pair's lock, held
//! from the read of the current quantity until the last write completes.

mod locks;

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub use locks::KeyedLocks;

use crate::domain::inventory::{normalize_item_name, InventoryItem, StockAction};
use crate::domain::tenant::TenantId;
use crate::domain::transaction::{total_amount, NewTransaction, TransactionId, TransactionType};
use crate::store::{LedgerStore, StoreError};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(
        "stock moved to {new_quantity} but the transaction was not recorded \
         (stock restored: {reverted}): {source}"
    )]
    TransactionNotRecorded { new_quantity: Decimal, reverted: bool, source: StoreError },
    #[error("Quantity or amount is too large to record for {item_name}")]
    Overflow { item_name: String },
}

impl LedgerError {
    /// Quantity the item was left at when a stock write could not be undone.
    ///
    /// `None` when the store still holds the quantity from before the call.
    pub fn applied_quantity(&self) -> Option<Decimal> {
        match self {
            Self::TransactionNotRecorded { new_quantity, reverted: false, .. } => {
                Some(*new_quantity)
            }
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordTransaction {
    pub tenant_id: TenantId,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub transaction_type: TransactionType,
    pub rate: Option<Decimal>,
    pub buyer_name: Option<String>,
    pub is_credit: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordedTransaction {
    pub transaction_id: TransactionId,
    pub new_quantity: Decimal,
    pub total_amount: Decimal,
}

struct StockMove {
    /// Row as it was before the write; `None` when the write created it.
    previous: Option<InventoryItem>,
    item: InventoryItem,
}

#[derive(Clone)]
pub struct InventoryLedger {
    store: Arc<dyn LedgerStore>,
    locks: Arc<KeyedLocks>,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store, locks: Arc::new(KeyedLocks::new()) }
    }

    /// Adds or removes `quantity` and returns the item's new quantity.
    ///
    /// A missing `unit` keeps whatever unit is stored; a supplied one overwrites it.
    /// The stored display name follows the casing of the latest write.
    pub async fn apply_stock_delta(
        &self,
        tenant_id: &TenantId,
        item_name: &str,
        quantity: Decimal,
        unit: Option<&str>,
        action: StockAction,
    ) -> Result<Decimal, LedgerError> {
        let item = self.adjust_stock(tenant_id, item_name, quantity, unit, action).await?;
        Ok(item.quantity)
    }

    /// Same as [`Self::apply_stock_delta`], returning the stored item.
    pub async fn adjust_stock(
        &self,
        tenant_id: &TenantId,
        item_name: &str,
        quantity: Decimal,
        unit: Option<&str>,
        action: StockAction,
    ) -> Result<InventoryItem, LedgerError> {
        let _guard = self.locks.acquire(tenant_id, item_name).await;
        let moved = self.move_stock(tenant_id, item_name, quantity, unit, action).await?;
        Ok(moved.item)
    }

    pub async fn record_transaction(
        &self,
        request: RecordTransaction,
    ) -> Result<RecordedTransaction, LedgerError> {
        let _guard = self.locks.acquire(&request.tenant_id, &request.item_name).await;

        let total = total_amount(request.quantity, request.rate)
            .ok_or_else(|| overflow(&request.tenant_id, &request.item_name))?;
        let action = request.transaction_type.stock_action();
        let moved = self
            .move_stock(
                &request.tenant_id,
                &request.item_name,
                request.quantity,
                request.unit.as_deref(),
                action,
            )
            .await?;
        let new_quantity = moved.item.quantity;

        let insert = self
            .store
            .insert_transaction(NewTransaction {
                tenant_id: request.tenant_id.clone(),
                item_name: moved.item.item_name.clone(),
                quantity: request.quantity,
                unit: moved.item.unit.clone(),
                transaction_type: request.transaction_type,
                rate: request.rate,
                total_amount: total,
                buyer_name: request.buyer_name.clone(),
                is_credit: request.is_credit,
            })
            .await;

        match insert {
            Ok(transaction_id) => {
                info!(
                    event_name = "ledger.transaction.recorded",
                    tenant_id = %request.tenant_id,
                    item_name = %moved.item.item_name,
                    transaction_id = %transaction_id,
                    transaction_type = request.transaction_type.as_str(),
                    quantity = %request.quantity,
                    total_amount = %total,
                    is_credit = request.is_credit,
                    "transaction recorded"
                );
                Ok(RecordedTransaction { transaction_id, new_quantity, total_amount: total })
            }
            Err(source) => {
                let reverted = self.compensate(&moved).await;
                warn!(
                    event_name = "ledger.transaction.not_recorded",
                    tenant_id = %request.tenant_id,
                    item_name = %moved.item.item_name,
                    new_quantity = %new_quantity,
                    reverted,
                    error = %source,
                    "transaction insert failed after stock mutation"
                );
                Err(LedgerError::TransactionNotRecorded { new_quantity, reverted, source })
            }
        }
    }

    pub async fn current_stock(
        &self,
        tenant_id: &TenantId,
        item_name: &str,
    ) -> Result<Option<InventoryItem>, LedgerError> {
        Ok(self.store.get_item(tenant_id, item_name).await?)
    }

    pub async fn stock_report(&self, tenant_id: &TenantId) -> Result<Vec<InventoryItem>, LedgerError> {
        Ok(self.store.list_items(tenant_id).await?)
    }

    // Caller must hold the item's lock.
    async fn move_stock(
        &self,
        tenant_id: &TenantId,
        item_name: &str,
        quantity: Decimal,
        unit: Option<&str>,
        action: StockAction,
    ) -> Result<StockMove, LedgerError> {
        let existing = self.store.get_item(tenant_id, item_name).await?;
        let previous_quantity = existing.as_ref().map(|item| item.quantity).unwrap_or(Decimal::ZERO);
        let new_quantity = action
            .apply(previous_quantity, quantity)
            .ok_or_else(|| overflow(tenant_id, item_name))?;

        let mut item = existing
            .clone()
            .unwrap_or_else(|| InventoryItem::new(tenant_id.clone(), item_name, Decimal::ZERO, ""));
        item.item_name = normalize_item_name(item_name);
        item.quantity = new_quantity;
        if let Some(unit) = unit {
            item.unit = unit.to_string();
        }

        let item = self.store.upsert_item(item).await?;

        info!(
            event_name = "ledger.stock.applied",
            tenant_id = %tenant_id,
            item_name = %item.item_name,
            action = action.as_str(),
            quantity = %quantity,
            previous_quantity = %previous_quantity,
            new_quantity = %item.quantity,
            "stock delta applied"
        );
        if item.quantity < Decimal::ZERO {
            warn!(
                event_name = "ledger.stock.negative",
                tenant_id = %tenant_id,
                item_name = %item.item_name,
                new_quantity = %item.quantity,
                "stock went negative; recording oversell as-is"
            );
        }

        Ok(StockMove { previous: existing, item })
    }

    async fn compensate(&self, moved: &StockMove) -> bool {
        let restored = match (&moved.previous, moved.item.id) {
            (Some(previous), _) => self.store.upsert_item(previous.clone()).await.map(|_| ()),
            (None, Some(created)) => self.store.delete_item(created).await,
            (None, None) => Ok(()),
        };
        match restored {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    event_name = "ledger.stock.compensation_failed",
                    tenant_id = %moved.item.tenant_id,
                    item_name = %moved.item.item_name,
                    error = %error,
                    "could not restore stock after failed transaction insert"
                );
                false
            }
        }
    }
}

fn overflow(tenant_id: &TenantId, item_name: &str) -> LedgerError {
    let item_name = normalize_item_name(item_name);
    warn!(
        event_name = "ledger.stock.overflow",
        tenant_id = %tenant_id,
        item_name = %item_name,
        "quantity or amount out of range; nothing written"
    );
    LedgerError::Overflow { item_name }
}
