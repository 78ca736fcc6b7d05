use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pantry_core::{DomainError, DomainResult};

/// Product name: the natural key of an inventory row (trimmed, non-empty).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductName(String);

impl ProductName {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ProductName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProductName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProductName> for String {
    fn from(value: ProductName) -> Self {
        value.0
    }
}

/// Input for adding a product to the pantry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInventoryItem {
    pub product_name: String,
    pub unit_weight: Decimal,
    pub price: Decimal,
    pub quantity: i64,
    pub category: String,
}

/// One stocked product.
///
/// # Invariants
/// - `quantity >= 0`
/// - `unit_weight > 0`, `price >= 0`
/// - `total_weight == unit_weight * quantity` after every mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    product_name: ProductName,
    unit_weight: Decimal,
    price: Decimal,
    quantity: i64,
    category: String,
    total_weight: Decimal,
}

impl InventoryItem {
    /// Validate input and build a new row with its derived total weight.
    pub fn create(new: NewInventoryItem) -> DomainResult<Self> {
        let product_name = ProductName::parse(&new.product_name)?;
        ensure_unit_weight(new.unit_weight)?;
        ensure_price(new.price)?;
        ensure_quantity(new.quantity)?;

        Ok(Self {
            product_name,
            unit_weight: new.unit_weight,
            price: new.price,
            quantity: new.quantity,
            category: new.category.trim().to_string(),
            total_weight: total_weight_of(new.unit_weight, new.quantity)?,
        })
    }

    /// Rehydrate a row read back from storage.
    ///
    /// The stored `total_weight` must agree with `unit_weight * quantity`;
    /// a disagreement means the row was written outside this type.
    pub fn from_stored(
        product_name: ProductName,
        unit_weight: Decimal,
        price: Decimal,
        quantity: i64,
        category: String,
        total_weight: Decimal,
    ) -> DomainResult<Self> {
        ensure_unit_weight(unit_weight)?;
        ensure_price(price)?;
        if quantity < 0 {
            return Err(DomainError::invariant(format!(
                "stored quantity for {product_name} is negative ({quantity})"
            )));
        }
        let expected = unit_weight
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| {
                DomainError::invariant(format!("stored quantity for {product_name} overflows its weight"))
            })?;
        if expected != total_weight {
            return Err(DomainError::invariant(format!(
                "stored total weight for {product_name} is {total_weight}, expected {expected}"
            )));
        }

        Ok(Self {
            product_name,
            unit_weight,
            price,
            quantity,
            category,
            total_weight,
        })
    }

    pub fn product_name(&self) -> &ProductName {
        &self.product_name
    }

    pub fn unit_weight(&self) -> Decimal {
        self.unit_weight
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn total_weight(&self) -> Decimal {
        self.total_weight
    }

    /// Weight of `quantity` units of this product.
    pub fn weight_for(&self, quantity: i64) -> DomainResult<Decimal> {
        total_weight_of(self.unit_weight, quantity)
    }

    /// Price of `quantity` units of this product.
    pub fn price_for(&self, quantity: i64) -> DomainResult<Decimal> {
        self.price.checked_mul(Decimal::from(quantity)).ok_or_else(|| {
            DomainError::validation(format!("price of {quantity} x {} is too large", self.product_name))
        })
    }

    /// Check whether `quantity` units weighing `weight` could be deducted now.
    ///
    /// Pure: never mutates. `deduct` runs the same checks before applying.
    pub fn check_deduction(&self, quantity: i64, weight: Decimal) -> DomainResult<()> {
        if quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity for {} must be positive",
                self.product_name
            )));
        }
        if quantity > self.quantity {
            return Err(DomainError::insufficient_stock(
                self.product_name.as_str(),
                quantity,
                self.quantity,
            ));
        }
        let expected = self.weight_for(quantity)?;
        if weight != expected {
            return Err(DomainError::validation(format!(
                "weight for {} x{} must be {expected}, got {weight}",
                self.product_name, quantity
            )));
        }
        Ok(())
    }

    /// Remove `quantity` units (and their `weight`) from stock.
    pub fn deduct(&mut self, quantity: i64, weight: Decimal) -> DomainResult<()> {
        self.check_deduction(quantity, weight)?;
        self.quantity -= quantity;
        self.total_weight -= weight;
        debug_assert_eq!(Ok(self.total_weight), self.weight_for(self.quantity));
        Ok(())
    }

    /// Admin edit: set a new price and on-hand quantity.
    ///
    /// Unit weight is fixed for the life of the row, so total weight is
    /// recomputed from it.
    pub fn update(&mut self, price: Decimal, quantity: i64) -> DomainResult<()> {
        ensure_price(price)?;
        ensure_quantity(quantity)?;
        let total_weight = self.weight_for(quantity)?;
        self.price = price;
        self.quantity = quantity;
        self.total_weight = total_weight;
        Ok(())
    }
}

/// `unit_weight * quantity`, or a validation error if it does not fit a `Decimal`.
fn total_weight_of(unit_weight: Decimal, quantity: i64) -> DomainResult<Decimal> {
    unit_weight
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| DomainError::validation(format!("total weight of {quantity} units is too large")))
}

fn ensure_unit_weight(unit_weight: Decimal) -> DomainResult<()> {
    if unit_weight <= Decimal::ZERO {
        return Err(DomainError::validation("unit weight must be greater than zero"));
    }
    Ok(())
}

fn ensure_price(price: Decimal) -> DomainResult<()> {
    if price < Decimal::ZERO {
        return Err(DomainError::validation("price cannot be negative"));
    }
    Ok(())
}

fn ensure_quantity(quantity: i64) -> DomainResult<()> {
    if quantity < 0 {
        return Err(DomainError::validation("quantity cannot be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rice(quantity: i64) -> InventoryItem {
        InventoryItem::create(NewInventoryItem {
            product_name: "Sona Masoori Rice".to_string(),
            unit_weight: Decimal::from(20),
            price: Decimal::from(25),
            quantity,
            category: "South Asian".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn create_derives_total_weight() {
        let item = rice(13);
        assert_eq!(item.total_weight(), Decimal::from(260));
        assert_eq!(item.product_name().as_str(), "Sona Masoori Rice");
    }

    #[test]
    fn create_rejects_bad_fields() {
        let base = NewInventoryItem {
            product_name: "Maggi Noodles".to_string(),
            unit_weight: Decimal::ONE,
            price: Decimal::new(50, 2),
            quantity: 400,
            category: "South Asian".to_string(),
        };

        let mut blank = base.clone();
        blank.product_name = "   ".to_string();
        assert!(matches!(InventoryItem::create(blank), Err(DomainError::Validation(_))));

        let mut weightless = base.clone();
        weightless.unit_weight = Decimal::ZERO;
        assert!(matches!(InventoryItem::create(weightless), Err(DomainError::Validation(_))));

        let mut negative_price = base.clone();
        negative_price.price = Decimal::new(-1, 0);
        assert!(matches!(InventoryItem::create(negative_price), Err(DomainError::Validation(_))));

        let mut negative_qty = base;
        negative_qty.quantity = -1;
        assert!(matches!(InventoryItem::create(negative_qty), Err(DomainError::Validation(_))));
    }

    #[test]
    fn deduct_reduces_quantity_and_weight() {
        let mut item = rice(13);
        item.deduct(5, Decimal::from(100)).unwrap();
        assert_eq!(item.quantity(), 8);
        assert_eq!(item.total_weight(), Decimal::from(160));
    }

    #[test]
    fn deduct_more_than_on_hand_is_rejected_without_change() {
        let mut item = rice(2);
        let before = item.clone();
        let err = item.deduct(5, Decimal::from(100)).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                product: "Sona Masoori Rice".to_string(),
                requested: 5,
                available: 2,
            }
        );
        assert_eq!(item, before);
    }

    #[test]
    fn deduct_with_inconsistent_weight_is_rejected() {
        let mut item = rice(13);
        let err = item.deduct(1, Decimal::from(7)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("must be 20")));
        assert_eq!(item.quantity(), 13);
    }

    #[test]
    fn deduct_zero_is_rejected() {
        let mut item = rice(13);
        assert!(matches!(item.deduct(0, Decimal::ZERO), Err(DomainError::Validation(_))));
    }

    #[test]
    fn update_recomputes_total_weight() {
        let mut item = rice(13);
        item.update(Decimal::new(2250, 2), 4).unwrap();
        assert_eq!(item.price(), Decimal::new(2250, 2));
        assert_eq!(item.total_weight(), Decimal::from(80));
    }

    #[test]
    fn oversized_totals_are_rejected_not_overflowed() {
        let huge = NewInventoryItem {
            product_name: "Bulk Atta".to_string(),
            unit_weight: Decimal::MAX,
            price: Decimal::ONE,
            quantity: 2,
            category: "South Asian".to_string(),
        };
        assert!(matches!(InventoryItem::create(huge.clone()), Err(DomainError::Validation(_))));

        let mut single = InventoryItem::create(NewInventoryItem { quantity: 1, ..huge }).unwrap();
        let before = single.clone();
        assert!(matches!(single.update(Decimal::ONE, i64::MAX), Err(DomainError::Validation(_))));
        assert_eq!(single, before);
    }

    #[test]
    fn price_for_reports_overflow() {
        let item = InventoryItem::create(NewInventoryItem {
            product_name: "Saffron".to_string(),
            unit_weight: Decimal::ONE,
            price: Decimal::MAX,
            quantity: 5,
            category: "Spices".to_string(),
        })
        .unwrap();
        assert_eq!(item.price_for(1).unwrap(), Decimal::MAX);
        assert!(matches!(item.price_for(2), Err(DomainError::Validation(_))));
        assert_eq!(item.weight_for(5).unwrap(), Decimal::from(5));
    }

    #[test]
    fn from_stored_rejects_drifted_total_weight() {
        // Seed rows from an older catalogue carried totals that did not match.
        let err = InventoryItem::from_stored(
            ProductName::parse("Toor Dahl (Red Lentils)").unwrap(),
            Decimal::from(7),
            Decimal::new(125, 2),
            1,
            "South Asian".to_string(),
            Decimal::from(70),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn serializes_with_camel_case_numbers() {
        let json = serde_json::to_value(rice(1)).unwrap();
        assert_eq!(json["productName"], "Sona Masoori Rice");
        assert_eq!(json["quantity"], 1);
        assert!(json["totalWeight"].is_number());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Deduct(i64),
        Update(i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i64..30).prop_map(Op::Deduct),
            (0i64..500).prop_map(Op::Update),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: whatever sequence of deductions and edits is attempted,
        /// quantity never goes negative and total weight stays derived.
        #[test]
        fn stock_invariants_hold(
            unit_weight in 1i64..50,
            start in 0i64..200,
            ops in prop::collection::vec(op(), 0..40)
        ) {
            let mut item = InventoryItem::create(NewInventoryItem {
                product_name: "Kurkure Msl".to_string(),
                unit_weight: Decimal::from(unit_weight),
                price: Decimal::new(89, 2),
                quantity: start,
                category: "South Asian".to_string(),
            }).unwrap();

            for op in ops {
                match op {
                    Op::Deduct(q) => {
                        let before = item.quantity();
                        let result = item.deduct(q, item.weight_for(q).unwrap());
                        prop_assert_eq!(result.is_ok(), q <= before);
                    }
                    Op::Update(q) => {
                        item.update(item.price(), q).unwrap();
                    }
                }
                prop_assert!(item.quantity() >= 0);
                prop_assert_eq!(item.total_weight(), item.weight_for(item.quantity()).unwrap());
            }
        }
    }
}
