use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use pantry_core::{DomainError, DomainResult};
use pantry_inventory::ProductName;

/// Who placed an order (the purchaser's email in practice).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PurchaserId(String);

impl PurchaserId {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("purchaser is required"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PurchaserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One product + quantity entry of a submitted order.
///
/// `requested_weight`, `total_price` and `category` are what the client saw
/// when building the cart. Only the weight is binding: when present it must
/// match the product's unit weight times the quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub product_name: ProductName,
    pub requested_quantity: i64,
    pub requested_weight: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub category: Option<String>,
}

impl OrderLineItem {
    pub fn new(product_name: &str, requested_quantity: i64) -> DomainResult<Self> {
        let product_name = ProductName::parse(product_name)?;
        if requested_quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity for {product_name} must be positive"
            )));
        }
        Ok(Self {
            product_name,
            requested_quantity,
            requested_weight: None,
            total_price: None,
            category: None,
        })
    }

    pub fn with_weight(mut self, weight: Decimal) -> Self {
        self.requested_weight = Some(weight);
        self
    }

    pub fn with_total_price(mut self, price: Decimal) -> Self {
        self.total_price = Some(price);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A validated batch: at least one line and a purchaser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBatch {
    purchaser: PurchaserId,
    lines: Vec<OrderLineItem>,
    totals: BTreeMap<ProductName, i64>,
}

impl OrderBatch {
    pub fn new(purchaser: &str, lines: Vec<OrderLineItem>) -> DomainResult<Self> {
        let purchaser = PurchaserId::parse(purchaser)?;
        if lines.is_empty() {
            return Err(DomainError::validation("order must contain at least one line item"));
        }
        if let Some(bad) = lines.iter().find(|l| l.requested_quantity <= 0) {
            return Err(DomainError::validation(format!(
                "quantity for {} must be positive",
                bad.product_name
            )));
        }
        let mut totals: BTreeMap<ProductName, i64> = BTreeMap::new();
        for line in &lines {
            let total = totals.entry(line.product_name.clone()).or_insert(0);
            *total = total.checked_add(line.requested_quantity).ok_or_else(|| {
                DomainError::validation(format!(
                    "total quantity requested for {} is too large",
                    line.product_name
                ))
            })?;
        }
        Ok(Self {
            purchaser,
            lines,
            totals,
        })
    }

    pub fn purchaser(&self) -> &PurchaserId {
        &self.purchaser
    }

    pub fn lines(&self) -> &[OrderLineItem] {
        &self.lines
    }

    /// Total quantity requested per product across the whole batch.
    ///
    /// A product listed on several lines must be covered by stock in sum, not
    /// line by line. Keys are sorted, which also gives a stable lock order.
    pub fn requested_by_product(&self) -> &BTreeMap<ProductName, i64> {
        &self.totals
    }
}
