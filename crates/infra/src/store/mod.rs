//! Pantry persistence: store traits and their in-memory and SQLite backends.

pub mod in_memory;
pub mod sqlite;
pub mod r#trait;

pub use in_memory::InMemoryPantryStore;
pub use r#trait::{
    InsertOutcome, InventoryStore, OrderStore, PantryStore, StockTransaction, StoreError,
    UserStore, VisitStore,
};
pub use sqlite::SqlitePantryStore;
