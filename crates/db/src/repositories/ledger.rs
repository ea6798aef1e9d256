use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use mandi_core::domain::inventory::{
    item_key, normalize_item_name, InventoryItem, InventoryItemId, ItemPatch,
};
use mandi_core::domain::tenant::TenantId;
use mandi_core::domain::transaction::{
    NewTransaction, Transaction, TransactionId, TransactionPatch, TransactionType,
};
use mandi_core::store::{LedgerStore, StoreError};

use super::store_error;
use crate::DbPool;

/// SQLite-backed store for inventory rows and the transaction log.
///
/// Quantities and money are persisted as canonical decimal text so values
/// round-trip exactly. Item rows are addressed by `(tenant_id, item_key)`.
pub struct SqlLedgerStore {
    pool: DbPool,
}

impl SqlLedgerStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn timestamp() -> String {
    // Fixed width keeps lexical order equal to time order.
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(raw)
        .map_err(|error| StoreError::Decode(format!("{field} `{raw}` is not a decimal: {error}")))
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|error| StoreError::Decode(format!("{name}: {error}")))
}

fn row_to_item(row: &SqliteRow) -> Result<InventoryItem, StoreError> {
    let quantity: String = column(row, "quantity")?;
    Ok(InventoryItem {
        id: Some(InventoryItemId(column(row, "id")?)),
        tenant_id: TenantId(column(row, "tenant_id")?),
        item_name: column(row, "item_name")?,
        quantity: parse_decimal("quantity", &quantity)?,
        unit: column(row, "unit")?,
    })
}

fn row_to_transaction(row: &SqliteRow) -> Result<Transaction, StoreError> {
    let quantity: String = column(row, "quantity")?;
    let rate: Option<String> = column(row, "rate")?;
    let total_amount: String = column(row, "total_amount")?;
    let transaction_type: String = column(row, "transaction_type")?;
    let created_at: String = column(row, "created_at")?;

    Ok(Transaction {
        id: TransactionId(column(row, "id")?),
        tenant_id: TenantId(column(row, "tenant_id")?),
        item_name: column(row, "item_name")?,
        quantity: parse_decimal("quantity", &quantity)?,
        unit: column(row, "unit")?,
        transaction_type: TransactionType::parse(&transaction_type).ok_or_else(|| {
            StoreError::Decode(format!("unknown transaction_type `{transaction_type}`"))
        })?,
        rate: rate.as_deref().map(|raw| parse_decimal("rate", raw)).transpose()?,
        total_amount: parse_decimal("total_amount", &total_amount)?,
        buyer_name: column(row, "buyer_name")?,
        is_credit: column(row, "is_credit")?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|error| StoreError::Decode(format!("created_at: {error}")))?,
    })
}

#[async_trait]
impl LedgerStore for SqlLedgerStore {
    async fn get_item(
        &self,
        tenant_id: &TenantId,
        item_name: &str,
    ) -> Result<Option<InventoryItem>, StoreError> {
        let row = sqlx::query(
            "SELECT id, tenant_id, item_name, quantity, unit
             FROM inventory WHERE tenant_id = ? AND item_key = ?",
        )
        .bind(&tenant_id.0)
        .bind(item_key(item_name))
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.as_ref().map(row_to_item).transpose()
    }

    async fn upsert_item(&self, mut item: InventoryItem) -> Result<InventoryItem, StoreError> {
        item.item_name = normalize_item_name(&item.item_name);
        let key = item.item_key();

        match item.id {
            None => {
                let result = sqlx::query(
                    "INSERT INTO inventory (tenant_id, item_name, item_key, quantity, unit, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(&item.tenant_id.0)
                .bind(&item.item_name)
                .bind(&key)
                .bind(item.quantity.to_string())
                .bind(&item.unit)
                .bind(timestamp())
                .execute(&self.pool)
                .await
                .map_err(store_error)?;
                item.id = Some(InventoryItemId(result.last_insert_rowid()));
            }
            Some(id) => {
                let affected = sqlx::query(
                    "UPDATE inventory
                     SET item_name = ?, item_key = ?, quantity = ?, unit = ?, updated_at = ?
                     WHERE id = ? AND tenant_id = ?",
                )
                .bind(&item.item_name)
                .bind(&key)
                .bind(item.quantity.to_string())
                .bind(&item.unit)
                .bind(timestamp())
                .bind(id.0)
                .bind(&item.tenant_id.0)
                .execute(&self.pool)
                .await
                .map_err(store_error)?
                .rows_affected();
                if affected == 0 {
                    return Err(StoreError::NotFound(format!("inventory item {id}")));
                }
            }
        }

        Ok(item)
    }

    async fn list_items(&self, tenant_id: &TenantId) -> Result<Vec<InventoryItem>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, item_name, quantity, unit
             FROM inventory WHERE tenant_id = ? ORDER BY item_key",
        )
        .bind(&tenant_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.iter().map(row_to_item).collect()
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<TransactionId, StoreError> {
        let id = TransactionId(Uuid::new_v4().to_string());

        sqlx::query(
            "INSERT INTO transactions (id, tenant_id, item_name, quantity, unit, transaction_type,
                                       rate, total_amount, buyer_name, is_credit, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id.0)
        .bind(&tx.tenant_id.0)
        .bind(&tx.item_name)
        .bind(tx.quantity.to_string())
        .bind(&tx.unit)
        .bind(tx.transaction_type.as_str())
        .bind(tx.rate.map(|rate| rate.to_string()))
        .bind(tx.total_amount.to_string())
        .bind(&tx.buyer_name)
        .bind(tx.is_credit)
        .bind(timestamp())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(id)
    }

    async fn list_transactions(
        &self,
        tenant_id: &TenantId,
        limit: u32,
    ) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, item_name, quantity, unit, transaction_type, rate,
                    total_amount, buyer_name, is_credit, created_at
             FROM transactions
             WHERE tenant_id = ?
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?",
        )
        .bind(&tenant_id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.iter().map(row_to_transaction).collect()
    }

    async fn update_item_fields(
        &self,
        item_id: InventoryItemId,
        patch: ItemPatch,
    ) -> Result<(), StoreError> {
        let item_name = patch.item_name.as_deref().map(normalize_item_name);
        let key = item_name.as_deref().map(item_key);

        let affected = sqlx::query(
            "UPDATE inventory
             SET item_name = COALESCE(?, item_name),
                 item_key = COALESCE(?, item_key),
                 quantity = COALESCE(?, quantity),
                 unit = COALESCE(?, unit),
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(item_name)
        .bind(key)
        .bind(patch.quantity.map(|quantity| quantity.to_string()))
        .bind(patch.unit)
        .bind(timestamp())
        .bind(item_id.0)
        .execute(&self.pool)
        .await
        .map_err(store_error)?
        .rows_affected();

        if affected == 0 {
            return Err(StoreError::NotFound(format!("inventory item {item_id}")));
        }
        Ok(())
    }

    async fn delete_item(&self, item_id: InventoryItemId) -> Result<(), StoreError> {
        let affected = sqlx::query("DELETE FROM inventory WHERE id = ?")
            .bind(item_id.0)
            .execute(&self.pool)
            .await
            .map_err(store_error)?
            .rows_affected();

        if affected == 0 {
            return Err(StoreError::NotFound(format!("inventory item {item_id}")));
        }
        Ok(())
    }

    async fn update_transaction_fields(
        &self,
        tx_id: &TransactionId,
        patch: TransactionPatch,
    ) -> Result<(), StoreError> {
        // Nullable columns take a "was set" flag so a patch can clear them.
        let affected = sqlx::query(
            "UPDATE transactions
             SET item_name = COALESCE(?, item_name),
                 quantity = COALESCE(?, quantity),
                 unit = COALESCE(?, unit),
                 rate = CASE WHEN ? THEN ? ELSE rate END,
                 total_amount = COALESCE(?, total_amount),
                 buyer_name = CASE WHEN ? THEN ? ELSE buyer_name END,
                 is_credit = COALESCE(?, is_credit)
             WHERE id = ?",
        )
        .bind(patch.item_name)
        .bind(patch.quantity.map(|quantity| quantity.to_string()))
        .bind(patch.unit)
        .bind(patch.rate.is_some())
        .bind(patch.rate.flatten().map(|rate| rate.to_string()))
        .bind(patch.total_amount.map(|total| total.to_string()))
        .bind(patch.buyer_name.is_some())
        .bind(patch.buyer_name.flatten())
        .bind(patch.is_credit)
        .bind(&tx_id.0)
        .execute(&self.pool)
        .await
        .map_err(store_error)?
        .rows_affected();

        if affected == 0 {
            return Err(StoreError::NotFound(format!("transaction {tx_id}")));
        }
        Ok(())
    }

    async fn delete_transaction(&self, tx_id: &TransactionId) -> Result<(), StoreError> {
        let affected = sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(&tx_id.0)
            .execute(&self.pool)
            .await
            .map_err(store_error)?
            .rows_affected();

        if affected == 0 {
            return Err(StoreError::NotFound(format!("transaction {tx_id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use mandi_core::domain::inventory::{InventoryItem, InventoryItemId, ItemPatch, StockAction};
    use mandi_core::domain::tenant::TenantId;
    use mandi_core::domain::transaction::{NewTransaction, TransactionPatch, TransactionType};
    use mandi_core::ledger::{InventoryLedger, RecordTransaction};
    use mandi_core::store::{LedgerStore, StoreError};

    use super::SqlLedgerStore;
    use crate::repositories::{SqlTenantRepository, TenantRepository};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    async fn tenant(pool: &DbPool, phone: &str) -> TenantId {
        SqlTenantRepository::new(pool.clone()).create(phone, None).await.expect("tenant").id
    }

    fn purchase(tenant_id: &TenantId, quantity: i64) -> NewTransaction {
        NewTransaction {
            tenant_id: tenant_id.clone(),
            item_name: "Potato".to_string(),
            quantity: Decimal::new(quantity, 0),
            unit: "bori".to_string(),
            transaction_type: TransactionType::Purchase,
            rate: Some(Decimal::new(1250, 1)),
            total_amount: Decimal::new(1250, 1) * Decimal::new(quantity, 0),
            buyer_name: None,
            is_credit: false,
        }
    }

    #[tokio::test]
    async fn items_round_trip_with_exact_decimals_and_case_insensitive_lookup() {
        let pool = pool().await;
        let shop = tenant(&pool, "+923000000001").await;
        let store = SqlLedgerStore::new(pool);

        let inserted = store
            .upsert_item(InventoryItem::new(shop.clone(), " Red  Onion ", Decimal::new(125, 1), "kg"))
            .await
            .expect("insert");
        let mut oversold = inserted.clone();
        oversold.quantity = Decimal::new(-25, 1);
        store.upsert_item(oversold).await.expect("update");

        let found = store.get_item(&shop, "red onion").await.expect("get").expect("item");
        assert_eq!(found.id, inserted.id);
        assert_eq!(found.item_name, "Red Onion");
        assert_eq!(found.quantity, Decimal::new(-25, 1));
        assert_eq!(store.list_items(&shop).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn duplicate_item_key_is_a_constraint_violation() {
        let pool = pool().await;
        let shop = tenant(&pool, "+923000000002").await;
        let store = SqlLedgerStore::new(pool);
        store
            .upsert_item(InventoryItem::new(shop.clone(), "Tomato", Decimal::ONE, "kg"))
            .await
            .expect("insert");

        let error = store
            .upsert_item(InventoryItem::new(shop, "TOMATO", Decimal::ONE, "kg"))
            .await
            .expect_err("duplicate");
        assert!(matches!(error, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn same_item_name_under_two_tenants_is_two_rows() {
        let pool = pool().await;
        let first = tenant(&pool, "+923000000003").await;
        let second = tenant(&pool, "+923000000004").await;
        let store = SqlLedgerStore::new(pool);

        store
            .upsert_item(InventoryItem::new(first.clone(), "Garlic", Decimal::TEN, "kg"))
            .await
            .expect("first");
        store
            .upsert_item(InventoryItem::new(second.clone(), "Garlic", Decimal::ONE, "kg"))
            .await
            .expect("second");

        let a = store.get_item(&first, "garlic").await.expect("get").expect("a");
        let b = store.get_item(&second, "garlic").await.expect("get").expect("b");
        assert_ne!(a.id, b.id);
        assert_eq!(b.quantity, Decimal::ONE);
    }

    #[tokio::test]
    async fn transactions_list_newest_first_with_limit() {
        let pool = pool().await;
        let shop = tenant(&pool, "+923000000005").await;
        let store = SqlLedgerStore::new(pool);

        for quantity in 1..=3 {
            store.insert_transaction(purchase(&shop, quantity)).await.expect("insert");
        }

        let listed = store.list_transactions(&shop, 2).await.expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].quantity, Decimal::new(3, 0));
        assert_eq!(listed[1].quantity, Decimal::new(2, 0));
        assert_eq!(listed[0].rate, Some(Decimal::new(1250, 1)));
        assert_eq!(listed[0].total_amount, Decimal::new(3750, 1));
        assert_eq!(listed[0].transaction_type, TransactionType::Purchase);
    }

    #[tokio::test]
    async fn transaction_for_unknown_tenant_is_rejected() {
        let pool = pool().await;
        let store = SqlLedgerStore::new(pool);

        let error = store
            .insert_transaction(purchase(&TenantId("ghost".to_string()), 1))
            .await
            .expect_err("foreign key");
        assert!(matches!(error, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn admin_patches_can_clear_nullable_columns_and_report_missing_rows() {
        let pool = pool().await;
        let shop = tenant(&pool, "+923000000006").await;
        let store = SqlLedgerStore::new(pool);
        let tx_id = store.insert_transaction(purchase(&shop, 4)).await.expect("insert");

        store
            .update_transaction_fields(
                &tx_id,
                TransactionPatch {
                    rate: Some(None),
                    total_amount: Some(Decimal::ZERO),
                    is_credit: Some(true),
                    ..TransactionPatch::default()
                },
            )
            .await
            .expect("patch");

        let listed = store.list_transactions(&shop, 10).await.expect("list");
        assert_eq!(listed[0].rate, None);
        assert_eq!(listed[0].total_amount, Decimal::ZERO);
        assert!(listed[0].is_credit);
        assert_eq!(listed[0].unit, "bori");

        store.delete_transaction(&tx_id).await.expect("delete");
        assert!(matches!(store.delete_transaction(&tx_id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.update_item_fields(InventoryItemId(999), ItemPatch::default()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_item(InventoryItemId(999)).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn ledger_over_sqlite_reconciles_stock_and_sale_total() {
        let pool = pool().await;
        let shop = tenant(&pool, "+923000000007").await;
        let store = Arc::new(SqlLedgerStore::new(pool));
        let ledger = InventoryLedger::new(store.clone());

        ledger
            .apply_stock_delta(&shop, "Tomato", Decimal::new(50, 0), Some("kg"), StockAction::In)
            .await
            .expect("stock in");
        let recorded = ledger
            .record_transaction(RecordTransaction {
                tenant_id: shop.clone(),
                item_name: "tomato".to_string(),
                quantity: Decimal::new(35, 0),
                unit: None,
                transaction_type: TransactionType::Sale,
                rate: Some(Decimal::new(200, 0)),
                buyer_name: Some("Imam".to_string()),
                is_credit: true,
            })
            .await
            .expect("sale");

        assert_eq!(recorded.new_quantity, Decimal::new(15, 0));
        assert_eq!(recorded.total_amount, Decimal::new(7000, 0));
        let listed = store.list_transactions(&shop, 1).await.expect("list");
        assert_eq!(listed[0].id, recorded.transaction_id);
        assert_eq!(listed[0].unit, "kg");
        assert_eq!(listed[0].buyer_name.as_deref(), Some("Imam"));
    }
}
