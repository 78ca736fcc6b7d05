use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use pantry_infra::store::UserStore;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", get(list_users).post(create_user))
}

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.store().list_users().await {
        Ok(users) => Json(users).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateUserRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let email = match body.email() {
        Ok(e) => e,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .register_user(email.clone(), body.display_name, body.role.unwrap_or_default())
        .await
    {
        Ok(Some(user)) => (StatusCode::CREATED, Json(user)).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::CONFLICT,
            "already_exists",
            format!("user {} already exists", email.as_str()),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}
