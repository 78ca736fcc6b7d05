use rust_decimal::Decimal;
use serde::Deserialize;

use pantry_core::{DomainResult, Email, Role};
use pantry_orders::OrderLineItem;

// -------------------------
// Request DTOs
// -------------------------

/// `PUT /inventory/:name`
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub price: Decimal,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    pub product_name: String,
    #[serde(alias = "quantity")]
    pub requested_quantity: i64,
    #[serde(default, alias = "weight")]
    pub requested_weight: Option<Decimal>,
    #[serde(default)]
    pub total_price: Option<Decimal>,
    #[serde(default)]
    pub category: Option<String>,
}

impl LineItemRequest {
    pub fn into_line_item(self) -> DomainResult<OrderLineItem> {
        let mut line = OrderLineItem::new(&self.product_name, self.requested_quantity)?;
        if let Some(weight) = self.requested_weight {
            line = line.with_weight(weight);
        }
        if let Some(price) = self.total_price {
            line = line.with_total_price(price);
        }
        if let Some(category) = self.category {
            line = line.with_category(category);
        }
        Ok(line)
    }
}

/// `POST /orders/finalize`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeOrderRequest {
    #[serde(default)]
    pub purchaser: String,
    #[serde(default)]
    pub line_items: Vec<LineItemRequest>,
}

impl FinalizeOrderRequest {
    pub fn into_parts(self) -> DomainResult<(String, Vec<OrderLineItem>)> {
        let lines = self
            .line_items
            .into_iter()
            .map(LineItemRequest::into_line_item)
            .collect::<DomainResult<Vec<_>>>()?;
        Ok((self.purchaser, lines))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub purchaser: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<usize>,
}

/// `POST /users`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl CreateUserRequest {
    pub fn email(&self) -> DomainResult<Email> {
        Email::parse(&self.email)
    }
}

/// `POST /visits`
#[derive(Debug, Default, Deserialize)]
pub struct RecordVisitRequest {
    #[serde(default)]
    pub email: Option<String>,
}

impl RecordVisitRequest {
    /// A blank email is an anonymous visit.
    pub fn email(&self) -> DomainResult<Option<Email>> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(Email::parse)
            .transpose()
    }
}
