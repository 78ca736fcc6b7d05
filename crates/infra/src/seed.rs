//! Starter catalogue and accounts.
//!
//! Seeding is idempotent: rows keyed by product name or email that already
//! exist are left as they are.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use pantry_core::{Email, Role, User};
use pantry_inventory::{InventoryItem, NewInventoryItem};

use crate::store::{InsertOutcome, InventoryStore, PantryStore, StoreError, UserStore};

const CATEGORY: &str = "South Asian";

/// (product name, unit weight, price in cents, quantity on hand)
const CATALOGUE: &[(&str, i64, i64, i64)] = &[
    ("Sona Masoori Rice", 20, 2500, 13),
    ("Toor Dahl (Red Lentils)", 7, 125, 1),
    ("Black Chickpeas (Channa)", 7, 125, 2),
    ("Maggi Noodles", 1, 50, 400),
    ("Parle Kream Bour", 1, 49, 10),
    ("P Hid Seek Bourb", 1, 49, 10),
    ("Sw Masl Bana", 1, 199, 10),
    ("Gop Snack Pe Cho", 1, 129, 10),
    ("Ad Banga Mix", 1, 199, 10),
    ("Sw Bhel Cup", 1, 129, 10),
    ("Magic Mas Upma", 1, 129, 10),
    ("Kurkure Msl", 1, 89, 10),
    ("Lays Chile Limon", 1, 89, 10),
    ("MTR Navaratan Korma", 1, 299, 10),
    ("MTR Alu Muttar", 1, 299, 10),
    ("MTR Mutter Paneer", 1, 299, 10),
    ("Mixed Vegetable Curry", 1, 299, 10),
    ("MTR Palak Paneer", 1, 299, 10),
    ("MTR Shahi Paneer", 1, 299, 10),
    ("MTR Bhindi Masala", 1, 299, 10),
    ("MTR Alu Methi", 1, 299, 10),
    ("MTR Chana Masala", 1, 299, 10),
    ("MTR Kadhi Pakora", 1, 299, 10),
    ("GITS Paneer Tikka Masala", 1, 299, 10),
    ("GITS Bhindi Masala", 1, 299, 10),
    ("GITS Pau Bhakti", 1, 299, 10),
    ("GITS Paneer Makhani", 1, 299, 10),
    ("GITS Aloo Raswala", 1, 299, 10),
    ("GITS Veg Biryani", 1, 299, 10),
    ("5 Minute Khana Aloo Mutter", 1, 299, 10),
    ("5 Minute Khana Pao Bhaji", 1, 299, 10),
];

const ACCOUNTS: &[(&str, &str, Role)] = &[
    ("student@pantry.example.edu", "Pantry Student", Role::Student),
    ("admin@pantry.example.edu", "Pantry Admin", Role::Admin),
];

/// How many rows a seeding run actually added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub items_inserted: usize,
    pub users_inserted: usize,
}

/// The starter catalogue as validated inventory rows.
pub fn catalogue() -> Result<Vec<InventoryItem>, StoreError> {
    CATALOGUE
        .iter()
        .map(|&(name, unit_weight, cents, quantity)| {
            InventoryItem::create(NewInventoryItem {
                product_name: name.to_string(),
                unit_weight: Decimal::from(unit_weight),
                price: Decimal::new(cents, 2),
                quantity,
                category: CATEGORY.to_string(),
            })
            .map_err(StoreError::from)
        })
        .collect()
}

#[instrument(skip(store))]
pub async fn seed(store: &dyn PantryStore) -> Result<SeedReport, StoreError> {
    let mut report = SeedReport::default();

    for item in catalogue()? {
        if store.insert_item(item).await? == InsertOutcome::Inserted {
            report.items_inserted += 1;
        }
    }

    let now = Utc::now();
    for &(email, display_name, role) in ACCOUNTS {
        let user = User::register(Email::parse(email)?, Some(display_name.to_string()), role, now);
        if store.insert_user(user).await? == InsertOutcome::Inserted {
            report.users_inserted += 1;
        }
    }

    tracing::info!(
        items = report.items_inserted,
        users = report.users_inserted,
        "seed data loaded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryPantryStore, SqlitePantryStore};
    use pantry_inventory::ProductName;

    #[test]
    fn catalogue_totals_follow_unit_weight() {
        let items = catalogue().unwrap();
        assert_eq!(items.len(), 31);
        for item in &items {
            assert_eq!(item.total_weight(), item.unit_weight() * Decimal::from(item.quantity()));
        }
        let rice = items
            .iter()
            .find(|i| i.product_name().as_str() == "Sona Masoori Rice")
            .unwrap();
        assert_eq!(rice.total_weight(), Decimal::from(260));
    }

    #[tokio::test]
    async fn seeding_twice_adds_nothing_the_second_time() {
        let store = InMemoryPantryStore::new();
        let first = seed(&store).await.unwrap();
        assert_eq!(first, SeedReport { items_inserted: 31, users_inserted: 2 });

        let second = seed(&store).await.unwrap();
        assert_eq!(second, SeedReport::default());
        assert_eq!(store.list_items().await.unwrap().len(), 31);
        assert_eq!(store.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn seeding_keeps_edited_rows() {
        let store = SqlitePantryStore::in_memory().await.unwrap();
        seed(&store).await.unwrap();

        let rice = ProductName::parse("Sona Masoori Rice").unwrap();
        store.update_item(&rice, Decimal::from(20), 3).await.unwrap();
        seed(&store).await.unwrap();

        assert_eq!(store.get_quantity(&rice).await.unwrap(), Some(3));
    }
}
