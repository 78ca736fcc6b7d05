use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use pantry_infra::store::{InsertOutcome, InventoryStore};
use pantry_inventory::{InventoryItem, NewInventoryItem, ProductName};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/:name", get(get_item).put(update_item).delete(delete_item))
}

fn product_name(raw: &str) -> Result<ProductName, Response> {
    ProductName::parse(raw).map_err(errors::domain_error_to_response)
}

pub async fn list_items(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.store().list_items().await {
        Ok(items) => Json(items).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewInventoryItem>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    let item = match InventoryItem::create(body) {
        Ok(item) => item,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store().insert_item(item.clone()).await {
        Ok(InsertOutcome::Inserted) => (StatusCode::CREATED, Json(item)).into_response(),
        Ok(InsertOutcome::AlreadyExists) => errors::json_error(
            StatusCode::CONFLICT,
            "already_exists",
            format!("product {} already exists", item.product_name()),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(name): Path<String>,
) -> Response {
    let name = match product_name(&name) {
        Ok(n) => n,
        Err(res) => return res,
    };

    match services.store().get_item(&name).await {
        Ok(Some(item)) => Json(item).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "product_not_found",
            format!("product not found: {name}"),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(name): Path<String>,
    body: Result<Json<dto::UpdateItemRequest>, JsonRejection>,
) -> Response {
    let name = match product_name(&name) {
        Ok(n) => n,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    match services.store().update_item(&name, body.price, body.quantity).await {
        Ok(item) => Json(item).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(name): Path<String>,
) -> Response {
    let name = match product_name(&name) {
        Ok(n) => n,
        Err(res) => return res,
    };

    match services.store().delete_item(&name).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::json_error(
            StatusCode::NOT_FOUND,
            "product_not_found",
            format!("product not found: {name}"),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}
