use axum::Router;

pub mod inventory;
pub mod orders;
pub mod system;
pub mod users;
pub mod visits;

/// Router for every pantry endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .nest("/inventory", inventory::router())
        .nest("/orders", orders::router())
        .nest("/users", users::router())
        .nest("/visits", visits::router())
}
