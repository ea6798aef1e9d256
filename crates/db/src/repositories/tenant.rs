use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use tracing::info;
use uuid::Uuid;

use mandi_core::domain::tenant::{
    normalize_phone_number, Tenant, TenantId, DEFAULT_BUSINESS_NAME,
};

use super::{RepositoryError, TenantRepository};
use crate::DbPool;

pub struct SqlTenantRepository {
    pool: DbPool,
}

impl SqlTenantRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_tenant(row: &SqliteRow) -> Result<Tenant, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let phone_number: String =
        row.try_get("phone_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let business_name: String =
        row.try_get("business_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("tenant created_at: {e}")))?;

    Ok(Tenant { id: TenantId(id), phone_number, business_name, created_at })
}

#[async_trait::async_trait]
impl TenantRepository for SqlTenantRepository {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Tenant>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, phone_number, business_name, created_at FROM tenants WHERE phone_number = ?",
        )
        .bind(normalize_phone_number(phone_number))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_tenant).transpose()
    }

    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, phone_number, business_name, created_at FROM tenants WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_tenant).transpose()
    }

    async fn create(
        &self,
        phone_number: &str,
        business_name: Option<&str>,
    ) -> Result<Tenant, RepositoryError> {
        let phone_number = normalize_phone_number(phone_number);
        let business_name = business_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_BUSINESS_NAME);

        let inserted = sqlx::query(
            "INSERT INTO tenants (id, phone_number, business_name, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(phone_number) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&phone_number)
        .bind(business_name)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?
        .rows_affected();

        let tenant = self.find_by_phone(&phone_number).await?.ok_or_else(|| {
            RepositoryError::Decode(format!("tenant {phone_number} vanished after insert"))
        })?;
        if inserted > 0 {
            info!(
                event_name = "db.tenant.created",
                tenant_id = %tenant.id,
                "tenant registered"
            );
        }
        Ok(tenant)
    }
}
