use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use pantry_core::{DomainResult, OrderId};
use pantry_inventory::{InventoryItem, ProductName};

use crate::line::{OrderLineItem, PurchaserId};

/// Persisted record of one deducted line item. Append-only: never mutated or
/// deleted once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: OrderId,
    pub purchaser: PurchaserId,
    pub product_name: ProductName,
    pub quantity: i64,
    pub weight: Decimal,
    pub price: Decimal,
    pub category: String,
    pub placed_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Build the record for `line`, pricing it from the inventory row it was
    /// deducted from.
    pub fn for_line(
        purchaser: &PurchaserId,
        line: &OrderLineItem,
        item: &InventoryItem,
        placed_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: OrderId::new(),
            purchaser: purchaser.clone(),
            product_name: line.product_name.clone(),
            quantity: line.requested_quantity,
            weight: item.weight_for(line.requested_quantity)?,
            price: item.price_for(line.requested_quantity)?,
            category: item.category().to_string(),
            placed_at,
        })
    }
}
