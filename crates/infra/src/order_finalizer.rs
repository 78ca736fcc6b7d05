//! Order finalization: validate a batch of line items against stock, then
//! deduct and record it, all or nothing.
//!
//! ## Flow
//!
//! ```text
//! lines + purchaser
//!   ↓
//! 1. Build the batch (non-empty, purchaser present, quantities > 0)
//!   ↓
//! 2. Lock every product in the batch (sorted order)
//!   ↓
//! 3. Begin a store transaction
//!   ↓
//! 4. Validation pass: every product exists, cumulative requests fit stock,
//!    supplied weights match unit weight × quantity
//!   ↓
//! 5. Apply pass: conditional deduct + append one order record per line
//!   ↓
//! 6. Commit
//! ```
//!
//! Any error before step 6 drops the transaction, which rolls it back; no
//! partial batch is ever visible.
//!
//! ## Concurrency
//!
//! Two calls touching the same product are serialized by a per-product async
//! lock held across both passes. Locks are taken in product-name order, so
//! overlapping batches cannot deadlock. The store's deduction is itself
//! conditional, so stock can never go negative even if a writer bypasses the
//! finalizer.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::instrument;

use pantry_core::DomainError;
use pantry_inventory::{InventoryItem, ProductName};
use pantry_orders::{OrderBatch, OrderLineItem, OrderRecord, PurchaserId};

use crate::store::{PantryStore, StockTransaction, StoreError};

#[derive(Debug, Error)]
pub enum FinalizeError {
    /// Malformed batch (empty, blank purchaser, non-positive quantity, wrong weight).
    #[error("invalid order: {0}")]
    Validation(String),

    #[error("not enough {product} in stock: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: i64,
        available: i64,
    },

    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("storage failure")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for FinalizeError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(product) => FinalizeError::ProductNotFound(product),
            StoreError::InsufficientStock {
                product,
                requested,
                available,
            } => FinalizeError::InsufficientStock {
                product,
                requested,
                available,
            },
            StoreError::Validation(msg) => FinalizeError::Validation(msg),
            other => FinalizeError::Storage(other),
        }
    }
}

impl From<DomainError> for FinalizeError {
    fn from(value: DomainError) -> Self {
        FinalizeError::from(StoreError::from(value))
    }
}

/// Outcome of a committed batch: one record per line, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedOrder {
    pub purchaser: PurchaserId,
    pub records: Vec<OrderRecord>,
}

/// Registry of per-product async locks.
#[derive(Debug, Clone, Default)]
struct ProductLocks {
    inner: Arc<StdMutex<HashMap<ProductName, Arc<Mutex<()>>>>>,
}

impl ProductLocks {
    fn handle(&self, name: &ProductName) -> Arc<Mutex<()>> {
        // The map is only touched for short, non-panicking inserts; a poisoned
        // guard still holds a consistent map.
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(name.clone()).or_default().clone()
    }

    /// Lock every product in `names`, which must be sorted.
    async fn acquire(&self, names: &[ProductName]) -> Vec<OwnedMutexGuard<()>> {
        let mut guards = Vec::with_capacity(names.len());
        for name in names {
            guards.push(self.handle(name).lock_owned().await);
        }
        guards
    }
}

/// Finalizes order batches against a [`PantryStore`].
#[derive(Clone)]
pub struct OrderFinalizer {
    store: Arc<dyn PantryStore>,
    locks: ProductLocks,
}

impl std::fmt::Debug for OrderFinalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderFinalizer").finish_non_exhaustive()
    }
}

impl OrderFinalizer {
    pub fn new(store: Arc<dyn PantryStore>) -> Self {
        Self {
            store,
            locks: ProductLocks::default(),
        }
    }

    /// Validate and apply `lines` for `purchaser` as one unit.
    ///
    /// On success every line's product has been reduced by exactly its
    /// requested quantity and one [`OrderRecord`] per line has been appended.
    /// On any error nothing has changed.
    #[instrument(skip(self, lines, purchaser), fields(purchaser = %purchaser, lines = lines.len()))]
    pub async fn finalize(
        &self,
        lines: Vec<OrderLineItem>,
        purchaser: &str,
    ) -> Result<FinalizedOrder, FinalizeError> {
        let batch = OrderBatch::new(purchaser, lines)?;

        match self.run(&batch).await {
            Ok(order) => {
                tracing::info!(records = order.records.len(), "order finalized");
                Ok(order)
            }
            Err(FinalizeError::Storage(err)) => {
                tracing::error!(error = %err, "order finalization failed in storage");
                Err(FinalizeError::Storage(err))
            }
            Err(err) => {
                tracing::info!(reason = %err, "order rejected");
                Err(err)
            }
        }
    }

    async fn run(&self, batch: &OrderBatch) -> Result<FinalizedOrder, FinalizeError> {
        let names: Vec<ProductName> = batch.requested_by_product().keys().cloned().collect();
        let _guards = self.locks.acquire(&names).await;

        let mut tx = self.store.begin().await?;
        validate(&mut tx, batch).await?;

        let placed_at = Utc::now();
        let mut records = Vec::with_capacity(batch.lines().len());
        for line in batch.lines() {
            let qty = line.requested_quantity;
            let current = tx
                .item(&line.product_name)
                .await?
                .ok_or_else(|| FinalizeError::ProductNotFound(line.product_name.to_string()))?;
            let weight = match line.requested_weight {
                Some(weight) => weight,
                None => current.weight_for(qty)?,
            };
            let updated = tx.deduct(&line.product_name, qty, weight).await?;
            let record = OrderRecord::for_line(batch.purchaser(), line, &updated, placed_at)?;
            tx.append_order(&record).await?;
            records.push(record);
        }

        tx.commit().await?;
        Ok(FinalizedOrder {
            purchaser: batch.purchaser().clone(),
            records,
        })
    }
}

/// Validation pass. Reads only; the transaction is untouched on failure.
async fn validate(
    tx: &mut Box<dyn StockTransaction>,
    batch: &OrderBatch,
) -> Result<(), FinalizeError> {
    // Projected rows: what each product would look like after the lines seen
    // so far, so repeated products are checked against what is left.
    let mut projected: BTreeMap<ProductName, (i64, InventoryItem)> = BTreeMap::new();

    for line in batch.lines() {
        let name = &line.product_name;
        let (on_hand, item) = match projected.entry(name.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let item = tx
                    .item(name)
                    .await?
                    .ok_or_else(|| FinalizeError::ProductNotFound(name.to_string()))?;
                entry.insert((item.quantity(), item))
            }
        };

        let qty = line.requested_quantity;
        if qty > item.quantity() {
            return Err(FinalizeError::InsufficientStock {
                product: name.to_string(),
                requested: *on_hand - item.quantity() + qty,
                available: *on_hand,
            });
        }
        let weight = match line.requested_weight {
            Some(weight) => weight,
            None => item.weight_for(qty)?,
        };
        item.deduct(qty, weight)?;
    }
    Ok(())
}
