//! Store Adapter: the narrow persistence seam the ledger depends on.
//!
//! Every call is a direct round trip to the backing store. Nothing here
//! caches, batches or retries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::inventory::{
    item_key, normalize_item_name, InventoryItem, InventoryItemId, ItemPatch,
};
use crate::domain::tenant::TenantId;
use crate::domain::transaction::{NewTransaction, Transaction, TransactionId, TransactionPatch};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store constraint violated: {0}")]
    Constraint(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("stored value could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_item(
        &self,
        tenant_id: &TenantId,
        item_name: &str,
    ) -> Result<Option<InventoryItem>, StoreError>;

    /// Inserts when `item.id` is `None`, otherwise replaces the row with that id.
    async fn upsert_item(&self, item: InventoryItem) -> Result<InventoryItem, StoreError>;

    async fn list_items(&self, tenant_id: &TenantId) -> Result<Vec<InventoryItem>, StoreError>;

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<TransactionId, StoreError>;

    /// Newest first.
    async fn list_transactions(
        &self,
        tenant_id: &TenantId,
        limit: u32,
    ) -> Result<Vec<Transaction>, StoreError>;

    async fn update_item_fields(
        &self,
        item_id: InventoryItemId,
        patch: ItemPatch,
    ) -> Result<(), StoreError>;

    async fn delete_item(&self, item_id: InventoryItemId) -> Result<(), StoreError>;

    async fn update_transaction_fields(
        &self,
        tx_id: &TransactionId,
        patch: TransactionPatch,
    ) -> Result<(), StoreError>;

    async fn delete_transaction(&self, tx_id: &TransactionId) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryState {
    next_item_id: i64,
    items: HashMap<InventoryItemId, InventoryItem>,
    transactions: Vec<Transaction>,
    fail_transaction_inserts: bool,
}

/// In-process store for tests and local runs.
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `insert_transaction` fail as if the store were down.
    pub fn fail_transaction_inserts(&self, fail: bool) {
        self.state().fail_transaction_inserts = fail;
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.state().transactions.clone()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get_item(
        &self,
        tenant_id: &TenantId,
        item_name: &str,
    ) -> Result<Option<InventoryItem>, StoreError> {
        let key = item_key(item_name);
        let state = self.state();
        Ok(state
            .items
            .values()
            .find(|item| &item.tenant_id == tenant_id && item.item_key() == key)
            .cloned())
    }

    async fn upsert_item(&self, mut item: InventoryItem) -> Result<InventoryItem, StoreError> {
        let mut state = self.state();
        let key = item.item_key();
        let clash = state.items.values().any(|existing| {
            existing.tenant_id == item.tenant_id
                && existing.item_key() == key
                && existing.id != item.id
        });
        if clash {
            return Err(StoreError::Constraint(format!(
                "inventory item `{}` already exists for tenant {}",
                item.item_name, item.tenant_id
            )));
        }

        let id = match item.id {
            Some(id) if state.items.contains_key(&id) => id,
            Some(id) => return Err(StoreError::NotFound(format!("inventory item {id}"))),
            None => {
                state.next_item_id += 1;
                InventoryItemId(state.next_item_id)
            }
        };
        item.id = Some(id);
        state.items.insert(id, item.clone());
        Ok(item)
    }

    async fn list_items(&self, tenant_id: &TenantId) -> Result<Vec<InventoryItem>, StoreError> {
        let state = self.state();
        let mut items = state
            .items
            .values()
            .filter(|item| &item.tenant_id == tenant_id)
            .cloned()
            .collect::<Vec<_>>();
        items.sort_by_key(|item| item.item_key());
        Ok(items)
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<TransactionId, StoreError> {
        let mut state = self.state();
        if state.fail_transaction_inserts {
            return Err(StoreError::Unavailable("transactions table is unreachable".to_string()));
        }

        let id = TransactionId(Uuid::new_v4().to_string());
        state.transactions.push(Transaction::from_new(id.clone(), tx, Utc::now()));
        Ok(id)
    }

    async fn list_transactions(
        &self,
        tenant_id: &TenantId,
        limit: u32,
    ) -> Result<Vec<Transaction>, StoreError> {
        let state = self.state();
        // Insertion order is creation order; reverse for newest first.
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|tx| &tx.tenant_id == tenant_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn update_item_fields(
        &self,
        item_id: InventoryItemId,
        patch: ItemPatch,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let Some(tenant_id) = state.items.get(&item_id).map(|item| item.tenant_id.clone()) else {
            return Err(StoreError::NotFound(format!("inventory item {item_id}")));
        };
        if let Some(item_name) = &patch.item_name {
            let key = item_key(item_name);
            let clash = state.items.values().any(|existing| {
                existing.tenant_id == tenant_id
                    && existing.item_key() == key
                    && existing.id != Some(item_id)
            });
            if clash {
                return Err(StoreError::Constraint(format!(
                    "inventory item `{}` already exists for tenant {tenant_id}",
                    normalize_item_name(item_name)
                )));
            }
        }

        let Some(item) = state.items.get_mut(&item_id) else {
            return Err(StoreError::NotFound(format!("inventory item {item_id}")));
        };
        if let Some(item_name) = patch.item_name {
            item.item_name = normalize_item_name(&item_name);
        }
        if let Some(quantity) = patch.quantity {
            item.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            item.unit = unit;
        }
        Ok(())
    }

    async fn delete_item(&self, item_id: InventoryItemId) -> Result<(), StoreError> {
        let mut state = self.state();
        match state.items.remove(&item_id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("inventory item {item_id}"))),
        }
    }

    async fn update_transaction_fields(
        &self,
        tx_id: &TransactionId,
        patch: TransactionPatch,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let Some(tx) = state.transactions.iter_mut().find(|tx| &tx.id == tx_id) else {
            return Err(StoreError::NotFound(format!("transaction {tx_id}")));
        };

        if let Some(item_name) = patch.item_name {
            tx.item_name = item_name;
        }
        if let Some(quantity) = patch.quantity {
            tx.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            tx.unit = unit;
        }
        if let Some(rate) = patch.rate {
            tx.rate = rate;
        }
        if let Some(total_amount) = patch.total_amount {
            tx.total_amount = total_amount;
        }
        if let Some(buyer_name) = patch.buyer_name {
            tx.buyer_name = buyer_name;
        }
        if let Some(is_credit) = patch.is_credit {
            tx.is_credit = is_credit;
        }
        Ok(())
    }

    async fn delete_transaction(&self, tx_id: &TransactionId) -> Result<(), StoreError> {
        let mut state = self.state();
        let before = state.transactions.len();
        state.transactions.retain(|tx| &tx.id != tx_id);
        if state.transactions.len() == before {
            return Err(StoreError::NotFound(format!("transaction {tx_id}")));
        }
        Ok(())
    }
}
