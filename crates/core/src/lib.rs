pub mod config;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod store;

pub use domain::inventory::{InventoryItem, InventoryItemId, ItemPatch, StockAction};
pub use domain::tenant::{Tenant, TenantId};
pub use domain::transaction::{
    NewTransaction, Transaction, TransactionId, TransactionPatch, TransactionType,
};
pub use errors::{DomainError, InterfaceError};
pub use ledger::{InventoryLedger, KeyedLocks, LedgerError, RecordTransaction, RecordedTransaction};
pub use store::{InMemoryLedgerStore, LedgerStore, StoreError};
