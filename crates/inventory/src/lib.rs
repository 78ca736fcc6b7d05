//! Inventory domain module.
//!
//! This crate contains business rules for pantry stock, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod item;

pub use item::{InventoryItem, NewInventoryItem, ProductName};
pub use rust_decimal::Decimal;
