//! Order domain module: line items, the batch rules applied before any stock
//! is touched, the append-only order record, and reporting over the history.

pub mod line;
pub mod popularity;
pub mod record;

pub use line::{OrderBatch, OrderLineItem, PurchaserId};
pub use popularity::{popular_items, PopularItem, DEFAULT_TOP_N};
pub use record::OrderRecord;
