use mandi_core::domain::inventory::StockAction;
use mandi_core::store::LedgerStore;
use mandi_db::repositories::{SqlLedgerStore, SqlTenantRepository, TenantRepository};
use mandi_db::{connect_with_settings, migrations, seed_tenant};
use rust_decimal::Decimal;

type SeedTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

async fn migrated_pool() -> SeedTestResult<mandi_db::DbPool> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect failed: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrations failed: {error}"))?;
    Ok(pool)
}

#[tokio::test]
async fn seeded_tenant_is_resolvable_from_channel_sender() -> SeedTestResult {
    let pool = migrated_pool().await?;

    let seeded = seed_tenant(&pool, "+923001234567", None)
        .await
        .map_err(|error| format!("seed failed: {error}"))?;
    let again = seed_tenant(&pool, "whatsapp:+923001234567", Some("Renamed"))
        .await
        .map_err(|error| format!("reseed failed: {error}"))?;

    require!(seeded.id == again.id, "seeding twice should keep one tenant");
    require!(seeded.business_name == "My Mandi Shop", "default business name expected");

    let resolved = SqlTenantRepository::new(pool.clone())
        .find_by_phone("whatsapp:+923001234567")
        .await
        .map_err(|error| format!("lookup failed: {error}"))?;
    require!(resolved.as_ref().map(|tenant| &tenant.id) == Some(&seeded.id));
    Ok(())
}

#[tokio::test]
async fn seeded_tenant_owns_its_inventory_rows() -> SeedTestResult {
    let pool = migrated_pool().await?;
    let tenant = seed_tenant(&pool, "+923009999999", Some("Imam Brothers"))
        .await
        .map_err(|error| format!("seed failed: {error}"))?;
    let store = SqlLedgerStore::new(pool);

    let quantity = StockAction::In
        .apply(Decimal::ZERO, Decimal::new(40, 0))
        .ok_or_else(|| "stock in overflowed".to_string())?;
    let item = mandi_core::InventoryItem::new(tenant.id.clone(), "Potato", quantity, "bori");
    store.upsert_item(item).await.map_err(|error| format!("upsert failed: {error}"))?;

    let items =
        store.list_items(&tenant.id).await.map_err(|error| format!("list failed: {error}"))?;
    require!(items.len() == 1, "expected one item, found {}", items.len());
    require!(items[0].quantity == Decimal::new(40, 0));
    require!(items[0].unit == "bori");
    Ok(())
}
