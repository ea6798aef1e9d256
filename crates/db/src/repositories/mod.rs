use async_trait::async_trait;
use thiserror::Error;

use mandi_core::domain::tenant::{Tenant, TenantId};
use mandi_core::store::StoreError;

pub mod ledger;
pub mod memory;
pub mod tenant;

pub use ledger::SqlLedgerStore;
pub use memory::InMemoryTenantRepository;
pub use tenant::SqlTenantRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => store_error(error),
            RepositoryError::Decode(message) => StoreError::Decode(message),
        }
    }
}

/// Classifies a driver error into the ledger's store taxonomy.
pub fn store_error(error: sqlx::Error) -> StoreError {
    match error {
        sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
        sqlx::Error::Database(db)
            if db.is_unique_violation() || db.is_foreign_key_violation() || db.is_check_violation() =>
        {
            StoreError::Constraint(db.message().to_string())
        }
        decode @ (sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)) => StoreError::Decode(decode.to_string()),
        other => StoreError::Unavailable(other.to_string()),
    }
}

/// Tenant identity lookup. Registration lives outside the ledger; the webhook
/// only resolves senders.
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Tenant>, RepositoryError>;

    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError>;

    /// Registers `phone_number`, or returns the existing tenant when it is already known.
    async fn create(
        &self,
        phone_number: &str,
        business_name: Option<&str>,
    ) -> Result<Tenant, RepositoryError>;
}
