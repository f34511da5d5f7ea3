use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

use crate::geo::{Coordinates, Location};
use crate::order::OrderStatus;

/// One line of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Catalog product id, when the item was picked from the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(alias = "meal")]
    pub name: String,
    #[serde(default = "default_qty", alias = "quantity")]
    pub qty: u32,
    /// Unit price the client saw; the catalog price wins when one exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

fn default_qty() -> u32 {
    1
}

impl OrderItem {
    pub fn named(name: impl Into<String>, qty: u32) -> Self {
        Self {
            id: None,
            name: name.into(),
            qty,
            price: None,
            emoji: None,
        }
    }

    /// `"🍕 Pizza x2"`
    pub fn label(&self) -> String {
        match &self.emoji {
            Some(emoji) => format!("{} {} x{}", emoji, self.name, self.qty),
            None => format!("{} x{}", self.name, self.qty),
        }
    }
}

/// A customer order and its delivery state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub order_id: String,
    pub user_id: i64,
    pub items: Vec<OrderItem>,
    pub comment: String,
    pub location: Location,
    pub status: OrderStatus,
    /// Minutes until arrival, as last estimated
    #[serde(rename = "eta")]
    pub eta_minutes: Option<u32>,
    pub driver_location: Option<Coordinates>,
    #[serde(serialize_with = "serialize_money")]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
}

impl Order {
    /// A fresh `pending` order
    pub fn pending(order_id: String, new: NewOrder, now: DateTime<Utc>) -> Self {
        Self {
            order_id,
            user_id: new.user_id,
            items: new.items,
            comment: new.comment,
            location: new.location,
            status: OrderStatus::Pending,
            eta_minutes: None,
            driver_location: None,
            total: new.total,
            created_at: now,
            updated_at: now,
            deleted: false,
        }
    }

    /// `"Pizza x2, Cola x1"`
    pub fn items_summary(&self) -> String {
        self.items.iter().map(OrderItem::label).join(", ")
    }
}

/// Everything needed to place an order; id and timestamps are assigned on insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: i64,
    pub items: Vec<OrderItem>,
    pub comment: String,
    pub location: Location,
    pub total: Decimal,
}

/// Order id for a user at a point in time: `"<user_id>_<epoch_ms>"`
pub fn order_id_for(user_id: i64, at: DateTime<Utc>) -> String {
    format!("{}_{}", user_id, at.timestamp_millis())
}

/// The instant one millisecond later, used when an id is already taken
pub fn next_id_instant(at: DateTime<Utc>) -> DateTime<Utc> {
    at + Duration::milliseconds(1)
}

/// Money always leaves the service with two decimals
pub fn serialize_money<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.2}", value))
}

/// Parses free-form meal text such as `"Pizza x2, Cola x1"`
///
/// Entries are split on commas and newlines; a missing or unreadable
/// quantity counts as one.
pub fn parse_meal_text(text: &str) -> Vec<OrderItem> {
    text.split([',', '\n'])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match lazy_regex::regex_captures!(r"^(.*?)\s*[xX×]\s*(\d+)$", entry) {
            Some((_, name, qty)) if !name.is_empty() => {
                OrderItem::named(name, qty.parse::<u32>().unwrap_or(1).max(1))
            }
            _ => OrderItem::named(entry, 1),
        })
        .collect()
}
