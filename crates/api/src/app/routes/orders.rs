use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Query,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use pantry_orders::{PurchaserId, DEFAULT_TOP_N};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders))
        .route("/finalize", post(finalize_order))
        .route("/popular", get(popular_items))
}

pub async fn finalize_order(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::FinalizeOrderRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let (purchaser, lines) = match body.into_parts() {
        Ok(parts) => parts,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.finalizer().finalize(lines, &purchaser).await {
        Ok(order) => Json(order).into_response(),
        Err(e) => errors::finalize_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::ListOrdersQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return errors::query_rejection(rejection),
    };

    let purchaser = match query.purchaser.as_deref().map(PurchaserId::parse).transpose() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.orders_for(purchaser.as_ref()).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn popular_items(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::PopularQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return errors::query_rejection(rejection),
    };

    match services.popular(query.limit.unwrap_or(DEFAULT_TOP_N)).await {
        Ok(items) => Json(items).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
