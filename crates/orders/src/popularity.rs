//! Popularity report over the order history.

use std::collections::HashMap;

use serde::Serialize;

use crate::record::OrderRecord;

/// Number of products returned when the caller does not ask for a limit.
pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularItem {
    pub name: String,
    pub total_quantity: i64,
}

/// Top `top_n` products by total quantity ordered, most popular first.
///
/// Names are compared after trimming; ties are broken by name so the report is
/// deterministic.
pub fn popular_items<'a, I>(records: I, top_n: usize) -> Vec<PopularItem>
where
    I: IntoIterator<Item = &'a OrderRecord>,
{
    let mut totals: HashMap<&str, i64> = HashMap::new();
    for record in records {
        let name = record.product_name.as_str().trim();
        if name.is_empty() {
            continue;
        }
        *totals.entry(name).or_insert(0) += record.quantity;
    }

    let mut items: Vec<PopularItem> = totals
        .into_iter()
        .map(|(name, total_quantity)| PopularItem {
            name: name.to_string(),
            total_quantity,
        })
        .collect();
    items.sort_by(|a, b| {
        b.total_quantity
            .cmp(&a.total_quantity)
            .then_with(|| a.name.cmp(&b.name))
    });
    items.truncate(top_n);
    items
}
