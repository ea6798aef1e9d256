use std::sync::Arc;

use mandi_core::domain::tenant::Tenant;
use mandi_core::ledger::InventoryLedger;
use mandi_core::store::LedgerStore;
use mandi_db::{DbPool, SqlLedgerStore, SqlTenantRepository, TenantRepository};

use crate::commands::{to_data, with_database, CommandFailure, CommandResult};

pub fn stock(phone: &str) -> CommandResult {
    let outcome = with_database("stock", |pool| async move {
        let tenant = registered_tenant(&pool, phone).await?;
        let ledger = InventoryLedger::new(Arc::new(SqlLedgerStore::new(pool)));
        let items = ledger
            .stock_report(&tenant.id)
            .await
            .map_err(|error| ("ledger_read", error.to_string(), 7u8))?;
        Ok((tenant, items))
    });

    match outcome {
        Ok((tenant, items)) => CommandResult::success_with_data(
            "stock",
            format!("{} item(s) on record for {}", items.len(), tenant.business_name),
            to_data(&items),
        ),
        Err(failure) => failure,
    }
}

pub fn transactions(phone: &str, limit: u32) -> CommandResult {
    let outcome = with_database("transactions", |pool| async move {
        let tenant = registered_tenant(&pool, phone).await?;
        let transactions = SqlLedgerStore::new(pool)
            .list_transactions(&tenant.id, limit)
            .await
            .map_err(|error| ("ledger_read", error.to_string(), 7u8))?;
        Ok((tenant, transactions))
    });

    match outcome {
        Ok((tenant, transactions)) => CommandResult::success_with_data(
            "transactions",
            format!("{} recent transaction(s) for {}", transactions.len(), tenant.business_name),
            to_data(&transactions),
        ),
        Err(failure) => failure,
    }
}

async fn registered_tenant(pool: &DbPool, phone: &str) -> Result<Tenant, CommandFailure> {
    SqlTenantRepository::new(pool.clone())
        .find_by_phone(phone)
        .await
        .map_err(|error| ("tenant_lookup", error.to_string(), 6u8))?
        .ok_or_else(|| ("tenant_not_found", format!("no tenant is registered for {phone}"), 6u8))
}
