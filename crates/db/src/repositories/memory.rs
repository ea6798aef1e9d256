use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use mandi_core::domain::tenant::{
    normalize_phone_number, Tenant, TenantId, DEFAULT_BUSINESS_NAME,
};

use super::{RepositoryError, TenantRepository};

/// Tenants keyed by normalized phone number.
#[derive(Default)]
pub struct InMemoryTenantRepository {
    tenants: RwLock<HashMap<String, Tenant>>,
}

impl InMemoryTenantRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TenantRepository for InMemoryTenantRepository {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Tenant>, RepositoryError> {
        let tenants = self.tenants.read().await;
        Ok(tenants.get(&normalize_phone_number(phone_number)).cloned())
    }

    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let tenants = self.tenants.read().await;
        Ok(tenants.values().find(|tenant| &tenant.id == id).cloned())
    }

    async fn create(
        &self,
        phone_number: &str,
        business_name: Option<&str>,
    ) -> Result<Tenant, RepositoryError> {
        let phone_number = normalize_phone_number(phone_number);
        let mut tenants = self.tenants.write().await;
        let tenant = tenants.entry(phone_number.clone()).or_insert_with(|| Tenant {
            id: TenantId(Uuid::new_v4().to_string()),
            phone_number,
            business_name: business_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_BUSINESS_NAME)
                .to_string(),
            created_at: Utc::now(),
        });
        Ok(tenant.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::repositories::{InMemoryTenantRepository, TenantRepository};

    #[tokio::test]
    async fn in_memory_tenant_repo_round_trip() {
        let repo = InMemoryTenantRepository::new();
        let tenant = repo.create("whatsapp:+923001112233", Some("  ")).await.expect("create");

        assert_eq!(tenant.phone_number, "+923001112233");
        assert_eq!(tenant.business_name, "My Mandi Shop");
        let found = repo.find_by_phone("+923001112233").await.expect("find");
        assert_eq!(found, Some(tenant.clone()));
        assert_eq!(repo.find_by_id(&tenant.id).await.expect("by id"), Some(tenant));
    }

    #[tokio::test]
    async fn in_memory_create_is_idempotent_per_phone() {
        let repo = InMemoryTenantRepository::new();
        let first = repo.create("+923001112233", Some("Rashid Traders")).await.expect("first");
        let second = repo.create("+923001112233", Some("Someone Else")).await.expect("second");

        assert_eq!(first, second);
    }
}
