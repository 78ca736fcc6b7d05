//! SQLite-backed pantry store.
//!
//! Decimals (weights, prices) are stored as TEXT so they round-trip exactly.
//! `quantity` carries a `CHECK (quantity >= 0)` constraint, and every deduction
//! is a compare-and-set on the quantity that was read, so a stale read can
//! never drive stock negative.
//!
//! SQLite allows one writer at a time, and a deferred transaction that reads
//! before it writes fails with `SQLITE_BUSY` when another connection is
//! already writing. Every write on a store handle therefore goes through one
//! async write gate, so writers queue instead of failing. Connections run in
//! WAL mode with a busy timeout, which covers other processes sharing the
//! file and keeps readers off the writer's path.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::instrument;

use pantry_core::{Email, OrderId, Role, User, UserId, Visit, VisitId};
use pantry_inventory::{InventoryItem, ProductName};
use pantry_orders::{OrderRecord, PurchaserId};

use super::r#trait::{
    InsertOutcome, InventoryStore, OrderStore, PantryStore, StockTransaction, StoreError,
    UserStore, VisitStore,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS inventory (
        product_id   INTEGER PRIMARY KEY,
        product_name TEXT UNIQUE NOT NULL,
        unit_weight  TEXT NOT NULL,
        price        TEXT NOT NULL,
        quantity     INTEGER NOT NULL CHECK (quantity >= 0),
        category     TEXT NOT NULL,
        total_weight TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        order_id     TEXT PRIMARY KEY,
        purchaser    TEXT NOT NULL,
        product_name TEXT NOT NULL,
        quantity     INTEGER NOT NULL,
        weight       TEXT NOT NULL,
        price        TEXT NOT NULL,
        category     TEXT NOT NULL,
        placed_at    TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        user_id      TEXT PRIMARY KEY,
        email        TEXT NOT NULL UNIQUE COLLATE NOCASE,
        display_name TEXT NULL,
        role         INTEGER NOT NULL,
        created_at   TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS visits (
        visit_id   TEXT PRIMARY KEY,
        user_email TEXT NULL,
        visited_at TEXT NOT NULL
    )
    "#,
];

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    tracing::error!(operation, error = %err, "sqlite operation failed");
    StoreError::Backend(format!("{operation}: {err}"))
}

fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(raw)
        .map_err(|e| StoreError::Corrupt(format!("{column} is not a decimal ({raw:?}): {e}")))
}

fn parse_uuid_column<T: FromStr>(column: &str, raw: &str) -> Result<T, StoreError>
where
    T::Err: core::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| StoreError::Corrupt(format!("{column}: {e}")))
}

fn decode_err(column: &str, err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(format!("failed to decode {column}: {err}"))
}

fn item_from_row(row: &SqliteRow) -> Result<InventoryItem, StoreError> {
    let name: String = row.try_get("product_name").map_err(|e| decode_err("product_name", e))?;
    let unit_weight: String = row.try_get("unit_weight").map_err(|e| decode_err("unit_weight", e))?;
    let price: String = row.try_get("price").map_err(|e| decode_err("price", e))?;
    let quantity: i64 = row.try_get("quantity").map_err(|e| decode_err("quantity", e))?;
    let category: String = row.try_get("category").map_err(|e| decode_err("category", e))?;
    let total_weight: String = row.try_get("total_weight").map_err(|e| decode_err("total_weight", e))?;

    let item = InventoryItem::from_stored(
        ProductName::parse(&name)?,
        parse_decimal("unit_weight", &unit_weight)?,
        parse_decimal("price", &price)?,
        quantity,
        category,
        parse_decimal("total_weight", &total_weight)?,
    )?;
    Ok(item)
}

fn order_from_row(row: &SqliteRow) -> Result<OrderRecord, StoreError> {
    let id: String = row.try_get("order_id").map_err(|e| decode_err("order_id", e))?;
    let purchaser: String = row.try_get("purchaser").map_err(|e| decode_err("purchaser", e))?;
    let product_name: String = row.try_get("product_name").map_err(|e| decode_err("product_name", e))?;
    let quantity: i64 = row.try_get("quantity").map_err(|e| decode_err("quantity", e))?;
    let weight: String = row.try_get("weight").map_err(|e| decode_err("weight", e))?;
    let price: String = row.try_get("price").map_err(|e| decode_err("price", e))?;
    let category: String = row.try_get("category").map_err(|e| decode_err("category", e))?;
    let placed_at: DateTime<Utc> = row.try_get("placed_at").map_err(|e| decode_err("placed_at", e))?;

    Ok(OrderRecord {
        id: parse_uuid_column::<OrderId>("order_id", &id)?,
        purchaser: PurchaserId::parse(&purchaser)?,
        product_name: ProductName::parse(&product_name)?,
        quantity,
        weight: parse_decimal("weight", &weight)?,
        price: parse_decimal("price", &price)?,
        category,
        placed_at,
    })
}

fn user_from_row(row: &SqliteRow) -> Result<User, StoreError> {
    let id: String = row.try_get("user_id").map_err(|e| decode_err("user_id", e))?;
    let email: String = row.try_get("email").map_err(|e| decode_err("email", e))?;
    let display_name: Option<String> =
        row.try_get("display_name").map_err(|e| decode_err("display_name", e))?;
    let role: i64 = row.try_get("role").map_err(|e| decode_err("role", e))?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(|e| decode_err("created_at", e))?;

    Ok(User {
        id: parse_uuid_column::<UserId>("user_id", &id)?,
        email: Email::parse(&email)?,
        display_name,
        role: Role::from_code(role)?,
        created_at,
    })
}

fn visit_from_row(row: &SqliteRow) -> Result<Visit, StoreError> {
    let id: String = row.try_get("visit_id").map_err(|e| decode_err("visit_id", e))?;
    let email: Option<String> = row.try_get("user_email").map_err(|e| decode_err("user_email", e))?;
    let visited_at: DateTime<Utc> = row.try_get("visited_at").map_err(|e| decode_err("visited_at", e))?;

    Ok(Visit {
        id: parse_uuid_column::<VisitId>("visit_id", &id)?,
        email: email.map(|e| Email::parse(&e)).transpose()?,
        visited_at,
    })
}

/// SQLite pantry store over a `sqlx` connection pool.
#[derive(Debug, Clone)]
pub struct SqlitePantryStore {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

impl SqlitePantryStore {
    /// Connect (creating the database file if needed) and ensure the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("parse_url", e))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database (tests/dev).
    ///
    /// Every SQLite `:memory:` connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| map_sqlx_error("parse_url", e))?;

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| map_sqlx_error("create_schema", e))?;
        }
        Ok(Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    async fn write_turn(&self) -> OwnedMutexGuard<()> {
        self.write_gate.clone().lock_owned().await
    }

    async fn begin_local(&self) -> Result<SqliteTransaction, StoreError> {
        let write = self.write_turn().await;
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(SqliteTransaction { tx, _write: write })
    }
}

#[async_trait]
impl InventoryStore for SqlitePantryStore {
    async fn list_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let rows = sqlx::query("SELECT * FROM inventory ORDER BY product_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;
        rows.iter().map(item_from_row).collect()
    }

    async fn get_item(&self, name: &ProductName) -> Result<Option<InventoryItem>, StoreError> {
        let row = sqlx::query("SELECT * FROM inventory WHERE product_name = ?")
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn get_quantity(&self, name: &ProductName) -> Result<Option<i64>, StoreError> {
        let row = sqlx::query("SELECT quantity FROM inventory WHERE product_name = ?")
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_quantity", e))?;
        row.map(|r| r.try_get::<i64, _>("quantity").map_err(|e| decode_err("quantity", e)))
            .transpose()
    }

    #[instrument(skip(self, item), fields(product = %item.product_name()), err)]
    async fn insert_item(&self, item: InventoryItem) -> Result<InsertOutcome, StoreError> {
        let _write = self.write_turn().await;
        let result = sqlx::query(
            r#"
            INSERT INTO inventory (product_name, unit_weight, price, quantity, category, total_weight)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(product_name) DO NOTHING
            "#,
        )
        .bind(item.product_name().as_str())
        .bind(item.unit_weight().to_string())
        .bind(item.price().to_string())
        .bind(item.quantity())
        .bind(item.category())
        .bind(item.total_weight().to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;

        Ok(if result.rows_affected() == 0 {
            InsertOutcome::AlreadyExists
        } else {
            InsertOutcome::Inserted
        })
    }

    #[instrument(skip(self), fields(product = %name), err)]
    async fn delete_item(&self, name: &ProductName) -> Result<bool, StoreError> {
        let _write = self.write_turn().await;
        let result = sqlx::query("DELETE FROM inventory WHERE product_name = ?")
            .bind(name.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(product = %name), err)]
    async fn update_item(
        &self,
        name: &ProductName,
        price: Decimal,
        quantity: i64,
    ) -> Result<InventoryItem, StoreError> {
        let mut tx = self.begin_local().await?;
        let mut item = tx
            .item(name)
            .await?
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        item.update(price, quantity)?;

        sqlx::query(
            "UPDATE inventory SET price = ?, quantity = ?, total_weight = ? WHERE product_name = ?",
        )
        .bind(item.price().to_string())
        .bind(item.quantity())
        .bind(item.total_weight().to_string())
        .bind(name.as_str())
        .execute(&mut *tx.tx)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;

        Box::new(tx).commit().await?;
        Ok(item)
    }

    #[instrument(skip(self), fields(product = %name), err)]
    async fn decrement(
        &self,
        name: &ProductName,
        quantity: i64,
        weight: Decimal,
    ) -> Result<InventoryItem, StoreError> {
        let mut tx = self.begin_local().await?;
        let item = tx.deduct(name, quantity, weight).await?;
        Box::new(tx).commit().await?;
        Ok(item)
    }
}

#[async_trait]
impl OrderStore for SqlitePantryStore {
    async fn list_orders(
        &self,
        purchaser: Option<&PurchaserId>,
    ) -> Result<Vec<OrderRecord>, StoreError> {
        let rows = match purchaser {
            Some(p) => {
                sqlx::query("SELECT * FROM orders WHERE purchaser = ? ORDER BY rowid")
                    .bind(p.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM orders ORDER BY rowid")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| map_sqlx_error("list_orders", e))?;
        rows.iter().map(order_from_row).collect()
    }
}

#[async_trait]
impl UserStore for SqlitePantryStore {
    async fn insert_user(&self, user: User) -> Result<InsertOutcome, StoreError> {
        let _write = self.write_turn().await;
        let result = sqlx::query(
            r#"
            INSERT INTO users (user_id, email, display_name, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(email) DO NOTHING
            "#,
        )
        .bind(user.id.to_string())
        .bind(user.email.as_str())
        .bind(user.display_name.as_deref())
        .bind(user.role.code())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        Ok(if result.rows_affected() == 0 {
            InsertOutcome::AlreadyExists
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn find_user(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY rowid")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }
}

#[async_trait]
impl VisitStore for SqlitePantryStore {
    async fn record_visit(&self, visit: Visit) -> Result<(), StoreError> {
        let _write = self.write_turn().await;
        sqlx::query("INSERT INTO visits (visit_id, user_email, visited_at) VALUES (?, ?, ?)")
            .bind(visit.id.to_string())
            .bind(visit.email.as_ref().map(Email::as_str))
            .bind(visit.visited_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("record_visit", e))?;
        Ok(())
    }

    async fn list_visits(&self) -> Result<Vec<Visit>, StoreError> {
        let rows = sqlx::query("SELECT * FROM visits ORDER BY rowid")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_visits", e))?;
        rows.iter().map(visit_from_row).collect()
    }
}

#[async_trait]
impl PantryStore for SqlitePantryStore {
    async fn begin(&self) -> Result<Box<dyn StockTransaction>, StoreError> {
        Ok(Box::new(self.begin_local().await?))
    }
}

/// A SQLite transaction; rolled back by `sqlx` when dropped uncommitted.
/// Holds the store's write gate until it is committed or dropped.
pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
    _write: OwnedMutexGuard<()>,
}

#[async_trait]
impl StockTransaction for SqliteTransaction {
    async fn item(&mut self, name: &ProductName) -> Result<Option<InventoryItem>, StoreError> {
        let row = sqlx::query("SELECT * FROM inventory WHERE product_name = ?")
            .bind(name.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("tx_get_item", e))?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn deduct(
        &mut self,
        name: &ProductName,
        quantity: i64,
        weight: Decimal,
    ) -> Result<InventoryItem, StoreError> {
        let mut item = self
            .item(name)
            .await?
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let seen_quantity = item.quantity();
        item.deduct(quantity, weight)?;

        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = ?, total_weight = ?
            WHERE product_name = ? AND quantity = ?
            "#,
        )
        .bind(item.quantity())
        .bind(item.total_weight().to_string())
        .bind(name.as_str())
        .bind(seen_quantity)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("tx_deduct", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "stock for {name} changed while deducting"
            )));
        }
        Ok(item)
    }

    async fn append_order(&mut self, record: &OrderRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (order_id, purchaser, product_name, quantity, weight, price, category, placed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.purchaser.as_str())
        .bind(record.product_name.as_str())
        .bind(record.quantity)
        .bind(record.weight.to_string())
        .bind(record.price.to_string())
        .bind(&record.category)
        .bind(record.placed_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("tx_append_order", e))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}
