//! Infrastructure layer: storage backends, order finalization, seed data.

pub mod order_finalizer;
pub mod seed;
pub mod store;


pub use order_finalizer::{FinalizeError, FinalizedOrder, OrderFinalizer};
pub use seed::{seed, SeedReport};
pub use store::{
    InMemoryPantryStore, InsertOutcome, InventoryStore, OrderStore, PantryStore,
    SqlitePantryStore, StockTransaction, StoreError, UserStore, VisitStore,
};
