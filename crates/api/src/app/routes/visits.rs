use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use pantry_infra::store::VisitStore;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", get(list_visits).post(record_visit))
}

pub async fn list_visits(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.store().list_visits().await {
        Ok(visits) => Json(visits).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn record_visit(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::RecordVisitRequest>, JsonRejection>,
) -> Response {
    // A visit without a body (or with `{}`) is anonymous.
    let body = match body {
        Ok(Json(b)) => b,
        Err(JsonRejection::MissingJsonContentType(_)) => dto::RecordVisitRequest::default(),
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let email = match body.email() {
        Ok(e) => e,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.record_visit(email).await {
        Ok(visit) => (StatusCode::CREATED, Json(visit)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
