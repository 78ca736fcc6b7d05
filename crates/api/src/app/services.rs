//! Service wiring: which store backs the API and the operations handlers use.

use std::sync::Arc;

use chrono::Utc;

use pantry_core::{Email, Role, User, Visit};
use pantry_infra::store::{
    InMemoryPantryStore, InsertOutcome, OrderStore, PantryStore, SqlitePantryStore, StoreError,
    UserStore, VisitStore,
};
use pantry_infra::{seed, OrderFinalizer};
use pantry_orders::{popular_items, OrderRecord, PopularItem, PurchaserId};

use crate::config::AppConfig;

/// Shared state behind every handler, created once at process start.
#[derive(Clone)]
pub struct AppServices {
    store: Arc<dyn PantryStore>,
    finalizer: OrderFinalizer,
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices").finish_non_exhaustive()
    }
}

impl AppServices {
    pub fn new(store: Arc<dyn PantryStore>) -> Self {
        let finalizer = OrderFinalizer::new(store.clone());
        Self { store, finalizer }
    }

    /// Pick the backend named by `config` and seed it if asked to.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn PantryStore> = match &config.database_url {
            Some(url) => {
                tracing::info!(max_connections = config.db_max_connections, "using sqlite store");
                Arc::new(SqlitePantryStore::connect(url, config.db_max_connections).await?)
            }
            None => {
                tracing::warn!("no database configured; using in-memory store");
                Arc::new(InMemoryPantryStore::new())
            }
        };

        if config.seed {
            seed(store.as_ref()).await?;
        }
        Ok(Self::new(store))
    }

    /// In-memory store loaded with the starter data.
    pub async fn seeded_in_memory() -> Result<Self, StoreError> {
        let store: Arc<dyn PantryStore> = Arc::new(InMemoryPantryStore::new());
        seed(store.as_ref()).await?;
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &dyn PantryStore {
        self.store.as_ref()
    }

    pub fn finalizer(&self) -> &OrderFinalizer {
        &self.finalizer
    }

    pub async fn register_user(
        &self,
        email: Email,
        display_name: Option<String>,
        role: Role,
    ) -> Result<Option<User>, StoreError> {
        let user = User::register(email, display_name, role, Utc::now());
        match self.store.insert_user(user.clone()).await? {
            InsertOutcome::Inserted => Ok(Some(user)),
            InsertOutcome::AlreadyExists => Ok(None),
        }
    }

    pub async fn record_visit(&self, email: Option<Email>) -> Result<Visit, StoreError> {
        let visit = Visit::new(email, Utc::now());
        self.store.record_visit(visit.clone()).await?;
        Ok(visit)
    }

    pub async fn popular(&self, top_n: usize) -> Result<Vec<PopularItem>, StoreError> {
        let records = self.store.list_orders(None).await?;
        Ok(popular_items(&records, top_n))
    }

    pub async fn orders_for(
        &self,
        purchaser: Option<&PurchaserId>,
    ) -> Result<Vec<OrderRecord>, StoreError> {
        self.store.list_orders(purchaser).await
    }
}
