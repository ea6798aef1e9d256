//! Local seed data so a fresh database can accept messages from a known sender.

use mandi_core::domain::tenant::Tenant;
use tracing::info;

use crate::connection::DbPool;
use crate::repositories::{RepositoryError, SqlTenantRepository, TenantRepository};

/// Registers `phone_number` if it is not already a tenant. Safe to run repeatedly.
pub async fn seed_tenant(
    pool: &DbPool,
    phone_number: &str,
    business_name: Option<&str>,
) -> Result<Tenant, RepositoryError> {
    let tenant = SqlTenantRepository::new(pool.clone()).create(phone_number, business_name).await?;
    info!(
        event_name = "db.fixtures.tenant_seeded",
        tenant_id = %tenant.id,
        business_name = %tenant.business_name,
        "seed tenant ready"
    );
    Ok(tenant)
}
