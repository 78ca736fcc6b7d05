use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use pantry_core::{DomainError, Email, User, Visit};
use pantry_inventory::{InventoryItem, ProductName};
use pantry_orders::{OrderRecord, PurchaserId};

/// Storage operation error.
///
/// Business outcomes the store enforces itself (missing rows, stock that would
/// go negative, duplicate keys) are kept apart from backend faults so callers
/// can report them precisely.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("not enough stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: i64,
        available: i64,
    },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored row failed to decode or broke a domain invariant.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InsufficientStock {
                product,
                requested,
                available,
            } => StoreError::InsufficientStock {
                product,
                requested,
                available,
            },
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => StoreError::Validation(msg),
            DomainError::InvariantViolation(msg) => StoreError::Corrupt(msg),
            DomainError::Conflict(msg) => StoreError::Conflict(msg),
            DomainError::NotFound => StoreError::NotFound("record".to_string()),
        }
    }
}

/// Result of an insert keyed by a natural key.
///
/// A duplicate key is not an error at this layer: the existing row is left
/// untouched and the caller decides whether that is a conflict.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Authoritative product rows, keyed by product name.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// All rows in insertion order.
    async fn list_items(&self) -> Result<Vec<InventoryItem>, StoreError>;

    async fn get_item(&self, name: &ProductName) -> Result<Option<InventoryItem>, StoreError>;

    async fn get_quantity(&self, name: &ProductName) -> Result<Option<i64>, StoreError>;

    async fn insert_item(&self, item: InventoryItem) -> Result<InsertOutcome, StoreError>;

    /// Returns `false` when no row had that name.
    async fn delete_item(&self, name: &ProductName) -> Result<bool, StoreError>;

    /// Set price and on-hand quantity; total weight is recomputed from the
    /// row's unit weight.
    async fn update_item(
        &self,
        name: &ProductName,
        price: Decimal,
        quantity: i64,
    ) -> Result<InventoryItem, StoreError>;

    /// Conditional decrement: applied only if the row keeps a non-negative
    /// quantity, otherwise `InsufficientStock` and no change.
    async fn decrement(
        &self,
        name: &ProductName,
        quantity: i64,
        weight: Decimal,
    ) -> Result<InventoryItem, StoreError>;
}

/// Read side of the append-only order history.
///
/// Records are only ever written through a [`StockTransaction`], together with
/// the deduction they describe.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Order records oldest first, optionally only one purchaser's.
    async fn list_orders(
        &self,
        purchaser: Option<&PurchaserId>,
    ) -> Result<Vec<OrderRecord>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Emails are unique case-insensitively.
    async fn insert_user(&self, user: User) -> Result<InsertOutcome, StoreError>;

    async fn find_user(&self, email: &Email) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
}

#[async_trait]
pub trait VisitStore: Send + Sync {
    async fn record_visit(&self, visit: Visit) -> Result<(), StoreError>;

    async fn list_visits(&self) -> Result<Vec<Visit>, StoreError>;
}

/// A unit of work over inventory and order history.
///
/// Nothing is visible to other callers until `commit`. Dropping the
/// transaction without committing discards every staged change.
#[async_trait]
pub trait StockTransaction: Send {
    /// Current row as seen by this transaction (including its own deductions).
    async fn item(&mut self, name: &ProductName) -> Result<Option<InventoryItem>, StoreError>;

    /// Conditional decrement within the transaction; returns the updated row.
    async fn deduct(
        &mut self,
        name: &ProductName,
        quantity: i64,
        weight: Decimal,
    ) -> Result<InventoryItem, StoreError>;

    async fn append_order(&mut self, record: &OrderRecord) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Everything the pantry persists, plus transactional access for ordering.
#[async_trait]
pub trait PantryStore: InventoryStore + OrderStore + UserStore + VisitStore {
    async fn begin(&self) -> Result<Box<dyn StockTransaction>, StoreError>;
}
