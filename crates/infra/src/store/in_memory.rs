use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use pantry_core::{Email, User, Visit};
use pantry_inventory::{InventoryItem, ProductName};
use pantry_orders::{OrderRecord, PurchaserId};

use super::r#trait::{
    InsertOutcome, InventoryStore, OrderStore, PantryStore, StockTransaction, StoreError,
    UserStore, VisitStore,
};

#[derive(Debug, Default)]
struct PantryState {
    items: Vec<InventoryItem>,
    orders: Vec<OrderRecord>,
    users: Vec<User>,
    visits: Vec<Visit>,
}

impl PantryState {
    fn item(&self, name: &ProductName) -> Option<&InventoryItem> {
        self.items.iter().find(|i| i.product_name() == name)
    }

    fn item_mut(&mut self, name: &ProductName) -> Option<&mut InventoryItem> {
        self.items.iter_mut().find(|i| i.product_name() == name)
    }
}

/// In-memory pantry store for tests/dev.
///
/// State lives as long as the store object. A transaction holds the state lock
/// until it is committed or dropped, so transactions are fully serialized.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPantryStore {
    state: Arc<Mutex<PantryState>>,
}

impl InMemoryPantryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn begin_local(&self) -> InMemoryTransaction {
        InMemoryTransaction {
            state: self.state.clone().lock_owned().await,
            staged: Vec::new(),
            orders: Vec::new(),
        }
    }
}

#[async_trait]
impl InventoryStore for InMemoryPantryStore {
    async fn list_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        Ok(self.state.lock().await.items.clone())
    }

    async fn get_item(&self, name: &ProductName) -> Result<Option<InventoryItem>, StoreError> {
        Ok(self.state.lock().await.item(name).cloned())
    }

    async fn get_quantity(&self, name: &ProductName) -> Result<Option<i64>, StoreError> {
        Ok(self.state.lock().await.item(name).map(InventoryItem::quantity))
    }

    async fn insert_item(&self, item: InventoryItem) -> Result<InsertOutcome, StoreError> {
        let mut state = self.state.lock().await;
        if state.item(item.product_name()).is_some() {
            return Ok(InsertOutcome::AlreadyExists);
        }
        state.items.push(item);
        Ok(InsertOutcome::Inserted)
    }

    async fn delete_item(&self, name: &ProductName) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.items.len();
        state.items.retain(|i| i.product_name() != name);
        Ok(state.items.len() != before)
    }

    async fn update_item(
        &self,
        name: &ProductName,
        price: Decimal,
        quantity: i64,
    ) -> Result<InventoryItem, StoreError> {
        let mut state = self.state.lock().await;
        let item = state
            .item_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        item.update(price, quantity)?;
        Ok(item.clone())
    }

    async fn decrement(
        &self,
        name: &ProductName,
        quantity: i64,
        weight: Decimal,
    ) -> Result<InventoryItem, StoreError> {
        let mut tx = self.begin_local().await;
        let item = tx.deduct(name, quantity, weight).await?;
        Box::new(tx).commit().await?;
        Ok(item)
    }
}

#[async_trait]
impl OrderStore for InMemoryPantryStore {
    async fn list_orders(
        &self,
        purchaser: Option<&PurchaserId>,
    ) -> Result<Vec<OrderRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .filter(|o| purchaser.is_none_or(|p| &o.purchaser == p))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for InMemoryPantryStore {
    async fn insert_user(&self, user: User) -> Result<InsertOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let key = user.email.key();
        if state.users.iter().any(|u| u.email.key() == key) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        state.users.push(user);
        Ok(InsertOutcome::Inserted)
    }

    async fn find_user(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let key = email.key();
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.email.key() == key).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.state.lock().await.users.clone())
    }
}

#[async_trait]
impl VisitStore for InMemoryPantryStore {
    async fn record_visit(&self, visit: Visit) -> Result<(), StoreError> {
        self.state.lock().await.visits.push(visit);
        Ok(())
    }

    async fn list_visits(&self) -> Result<Vec<Visit>, StoreError> {
        Ok(self.state.lock().await.visits.clone())
    }
}

#[async_trait]
impl PantryStore for InMemoryPantryStore {
    async fn begin(&self) -> Result<Box<dyn StockTransaction>, StoreError> {
        Ok(Box::new(self.begin_local().await))
    }
}

/// Staged changes over the locked state; applied on commit, discarded on drop.
pub struct InMemoryTransaction {
    state: OwnedMutexGuard<PantryState>,
    staged: Vec<InventoryItem>,
    orders: Vec<OrderRecord>,
}

#[async_trait]
impl StockTransaction for InMemoryTransaction {
    async fn item(&mut self, name: &ProductName) -> Result<Option<InventoryItem>, StoreError> {
        if let Some(staged) = self.staged.iter().find(|i| i.product_name() == name) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.state.item(name).cloned())
    }

    async fn deduct(
        &mut self,
        name: &ProductName,
        quantity: i64,
        weight: Decimal,
    ) -> Result<InventoryItem, StoreError> {
        let mut item = self
            .item(name)
            .await?
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        item.deduct(quantity, weight)?;

        match self.staged.iter_mut().find(|i| i.product_name() == name) {
            Some(slot) => *slot = item.clone(),
            None => self.staged.push(item.clone()),
        }
        Ok(item)
    }

    async fn append_order(&mut self, record: &OrderRecord) -> Result<(), StoreError> {
        self.orders.push(record.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTransaction {
            mut state,
            staged,
            orders,
        } = *self;

        for item in staged {
            match state.item_mut(item.product_name()) {
                Some(slot) => *slot = item,
                None => {
                    return Err(StoreError::Conflict(format!(
                        "{} was removed during the transaction",
                        item.product_name()
                    )));
                }
            }
        }
        state.orders.extend(orders);
        Ok(())
    }
}
