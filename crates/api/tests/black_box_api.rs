use std::sync::Arc;

use pantry_api::app::{build_app, services::AppServices};
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Same router as prod over a seeded in-memory store, on an ephemeral port.
    async fn spawn() -> Self {
        let services = AppServices::seeded_in_memory().await.unwrap();
        let app = build_app(Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

const RICE: &str = "/inventory/Sona%20Masoori%20Rice";

async fn quantity_of(client: &reqwest::Client, srv: &TestServer, path: &str) -> i64 {
    let res = client.get(srv.url(path)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["quantity"].as_i64().unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn seeded_catalogue_is_listed() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/inventory")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let items: Vec<Value> = res.json().await.unwrap();
    assert_eq!(items.len(), 31);
    let rice = items
        .iter()
        .find(|i| i["productName"] == "Sona Masoori Rice")
        .unwrap();
    assert_eq!(rice["quantity"], 13);
    assert_eq!(rice["totalWeight"].as_f64().unwrap(), 260.0);
}

#[tokio::test]
async fn inventory_lifecycle_create_update_delete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let new_item = json!({
        "productName": "Basmati Rice",
        "unitWeight": 10,
        "price": 12.5,
        "quantity": 4,
        "category": "South Asian"
    });
    let res = client.post(srv.url("/inventory")).json(&new_item).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["totalWeight"].as_f64().unwrap(), 40.0);

    let dup = client.post(srv.url("/inventory")).json(&new_item).send().await.unwrap();
    assert_eq!(dup.status(), StatusCode::CONFLICT);
    let body: Value = dup.json().await.unwrap();
    assert_eq!(body["error"], "already_exists");

    let res = client
        .put(srv.url("/inventory/Basmati%20Rice"))
        .json(&json!({ "price": 11, "quantity": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["quantity"], 7);
    assert_eq!(updated["totalWeight"].as_f64().unwrap(), 70.0);

    let res = client.delete(srv.url("/inventory/Basmati%20Rice")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client.get(srv.url("/inventory/Basmati%20Rice")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = client.delete(srv.url("/inventory/Basmati%20Rice")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_inventory_input_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/inventory"))
        .json(&json!({
            "productName": "Bad Flour",
            "unitWeight": 1,
            "price": 1,
            "quantity": -3,
            "category": "Baking"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/inventory"))
        .json(&json!({ "productName": "Missing Fields" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");
}

#[tokio::test]
async fn oversized_inventory_totals_are_400_not_a_crash() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/inventory"))
        .json(&json!({
            "productName": "Heavy Sack",
            "unitWeight": 1e22,
            "price": 1,
            "quantity": i64::MAX,
            "category": "Bulk"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/inventory"))
        .json(&json!({
            "productName": "Heavy Sack",
            "unitWeight": 1e22,
            "price": 1,
            "quantity": 1,
            "category": "Bulk"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .put(srv.url("/inventory/Heavy%20Sack"))
        .json(&json!({ "price": 1, "quantity": i64::MAX }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(quantity_of(&client, &srv, "/inventory/Heavy%20Sack").await, 1);

    // The server is still serving after both rejections.
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn finalize_deducts_stock_and_records_order() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/orders/finalize"))
        .json(&json!({
            "purchaser": "student@pantry.example.edu",
            "lineItems": [
                { "productName": "Sona Masoori Rice", "requestedQuantity": 5, "requestedWeight": 100 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let order: Value = res.json().await.unwrap();
    let records = order["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["quantity"], 5);
    assert_eq!(records[0]["price"].as_f64().unwrap(), 125.0);

    assert_eq!(quantity_of(&client, &srv, RICE).await, 8);

    let history: Vec<Value> = client
        .get(srv.url("/orders?purchaser=student@pantry.example.edu"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["productName"], "Sona Masoori Rice");
}

#[tokio::test]
async fn over_request_is_409_and_changes_nothing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/orders/finalize"))
        .json(&json!({
            "purchaser": "student@pantry.example.edu",
            "lineItems": [
                { "productName": "Maggi Noodles", "requestedQuantity": 2 },
                { "productName": "Black Chickpeas (Channa)", "requestedQuantity": 5 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");
    assert!(body["message"].as_str().unwrap().contains("Black Chickpeas (Channa)"));

    assert_eq!(quantity_of(&client, &srv, "/inventory/Maggi%20Noodles").await, 400);
    let history: Vec<Value> = client.get(srv.url("/orders")).send().await.unwrap().json().await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn finalize_rejects_unknown_products_and_malformed_batches() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let ghost = client
        .post(srv.url("/orders/finalize"))
        .json(&json!({
            "purchaser": "student@pantry.example.edu",
            "lineItems": [{ "productName": "Ghost", "requestedQuantity": 1 }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(ghost.status(), StatusCode::NOT_FOUND);
    let body: Value = ghost.json().await.unwrap();
    assert_eq!(body["error"], "product_not_found");

    let empty = client
        .post(srv.url("/orders/finalize"))
        .json(&json!({ "purchaser": "student@pantry.example.edu", "lineItems": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let anonymous = client
        .post(srv.url("/orders/finalize"))
        .json(&json!({ "lineItems": [{ "productName": "Maggi Noodles", "requestedQuantity": 1 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn concurrent_orders_never_oversell() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let order = json!({
        "purchaser": "student@pantry.example.edu",
        "lineItems": [{ "productName": "Sona Masoori Rice", "requestedQuantity": 7 }]
    });

    let (a, b) = tokio::join!(
        client.post(srv.url("/orders/finalize")).json(&order).send(),
        client.post(srv.url("/orders/finalize")).json(&order).send(),
    );
    let statuses = [a.unwrap().status(), b.unwrap().status()];
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1);
    assert!(statuses.contains(&StatusCode::CONFLICT));
    assert_eq!(quantity_of(&client, &srv, RICE).await, 6);
}

#[tokio::test]
async fn popular_report_ranks_by_total_quantity() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for (product, qty) in [("Maggi Noodles", 4), ("Kurkure Msl", 1), ("Maggi Noodles", 2), ("Sw Bhel Cup", 3)] {
        let res = client
            .post(srv.url("/orders/finalize"))
            .json(&json!({
                "purchaser": "student@pantry.example.edu",
                "lineItems": [{ "productName": product, "requestedQuantity": qty }]
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let top: Vec<Value> = client
        .get(srv.url("/orders/popular?limit=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["name"], "Maggi Noodles");
    assert_eq!(top[0]["totalQuantity"], 6);
    assert_eq!(top[1]["name"], "Sw Bhel Cup");

    let all: Vec<Value> = client.get(srv.url("/orders/popular")).send().await.unwrap().json().await.unwrap();
    assert_eq!(all.len(), 3);

    let none: Vec<Value> = client
        .get(srv.url("/orders/popular?limit=0"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn users_are_unique_by_email_ignoring_case() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/users"))
        .json(&json!({ "email": "new.student@umbc.edu", "displayName": "New Student" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let user: Value = res.json().await.unwrap();
    assert_eq!(user["role"], "student");

    let dup = client
        .post(srv.url("/users"))
        .json(&json!({ "email": "NEW.STUDENT@umbc.edu", "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(dup.status(), StatusCode::CONFLICT);

    let bad = client
        .post(srv.url("/users"))
        .json(&json!({ "email": "not-an-email" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

    let users: Vec<Value> = client.get(srv.url("/users")).send().await.unwrap().json().await.unwrap();
    assert_eq!(users.len(), 3);
}

#[tokio::test]
async fn visits_can_be_anonymous() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.post(srv.url("/visits")).json(&json!({})).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = client.post(srv.url("/visits")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = client
        .post(srv.url("/visits"))
        .json(&json!({ "email": "student@pantry.example.edu" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let visits: Vec<Value> = client.get(srv.url("/visits")).send().await.unwrap().json().await.unwrap();
    assert_eq!(visits.len(), 3);
    assert!(visits[0]["email"].is_null());
    assert_eq!(visits[2]["email"], "student@pantry.example.edu");
}

#[tokio::test]
async fn cors_allows_other_origins() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/inventory"))
        .header("Origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}
