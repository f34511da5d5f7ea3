//! Products, admin users, admin chat and driver statistics

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::core::config::limits::MAX_ITEM_PRICE;
use crate::core::error::{AppError, AppResult};

/// Unit price for a quantity tier, bounds inclusive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub price: Decimal,
    #[serde(default = "first_unit")]
    pub min: u32,
    #[serde(default = "unbounded")]
    pub max: u32,
}

fn first_unit() -> u32 {
    1
}

fn unbounded() -> u32 {
    u32::MAX
}

impl PriceRange {
    pub fn contains(&self, qty: u32) -> bool {
        self.min <= qty && qty <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub emoji: Option<String>,
    pub price_ranges: Vec<PriceRange>,
    pub image_url: Option<String>,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Catalog unit price for `qty`: the first tier containing it
    pub fn unit_price(&self, qty: u32) -> Option<Decimal> {
        self.price_ranges.iter().find(|range| range.contains(qty)).map(|range| range.price)
    }
}

/// Product fields as posted by the dashboard
///
/// A flat `price` is still accepted and becomes a single tier for any quantity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub price_ranges: Option<Vec<PriceRange>>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub available: Option<bool>,
}

/// A validated product, ready to store
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub emoji: Option<String>,
    pub price_ranges: Vec<PriceRange>,
    pub image_url: Option<String>,
    pub available: bool,
}

impl ProductInput {
    pub fn validate(self) -> AppResult<ProductDraft> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::Validation("Missing name".to_string()))?;

        let price_ranges = match (self.price_ranges, self.price) {
            (Some(ranges), _) if !ranges.is_empty() => ranges,
            (_, Some(price)) => vec![PriceRange {
                price,
                min: first_unit(),
                max: unbounded(),
            }],
            _ => return Err(AppError::Validation("Missing price_ranges".to_string())),
        };

        if let Some(bad) = price_ranges
            .iter()
            .find(|r| r.min > r.max || r.price.is_sign_negative() || r.price > Decimal::from(MAX_ITEM_PRICE))
        {
            return Err(AppError::Validation(format!(
                "Invalid price range {}..{} at {}",
                bad.min, bad.max, bad.price
            )));
        }

        Ok(ProductDraft {
            name,
            emoji: self.emoji.filter(|e| !e.trim().is_empty()),
            price_ranges,
            image_url: self.image_url.filter(|u| !u.trim().is_empty()),
            available: self.available.unwrap_or(true),
        })
    }
}

/// Telegram user allowed to drive orders from the admin chat
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminUser {
    pub user_id: i64,
    pub nickname: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Line of the dashboard's admin chat
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminMessage {
    pub id: i64,
    pub user_id: i64,
    pub nickname: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAdminMessage {
    pub user_id: i64,
    pub nickname: Option<String>,
    pub message: String,
}

/// One driver's totals for one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverStat {
    pub user_id: i64,
    pub nickname: Option<String>,
    pub date: NaiveDate,
    pub orders_delivered: i32,
    pub profit: Decimal,
    pub hours_worked: Decimal,
    pub km_driven: Decimal,
}

/// How many units of a product were ordered in a period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductStat {
    pub product_id: i64,
    pub name: String,
    pub count: i64,
    pub period: DateTime<Utc>,
}

/// Bucket size for product statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StatsPeriod {
    #[default]
    Day,
    Week,
    Month,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(ranges: serde_json::Value) -> Product {
        Product {
            id: 1,
            name: "Pizza".to_string(),
            emoji: None,
            price_ranges: serde_json::from_value(ranges).unwrap(),
            image_url: None,
            available: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_unit_price_picks_first_matching_tier() {
        let pizza = product(json!([
            {"price": 10, "min": 1, "max": 2},
            {"price": "8.5", "min": 3, "max": 10}
        ]));
        assert_eq!(pizza.unit_price(1), Some(Decimal::from(10)));
        assert_eq!(pizza.unit_price(2), Some(Decimal::from(10)));
        assert_eq!(pizza.unit_price(3), Some(Decimal::new(85, 1)));
        assert_eq!(pizza.unit_price(11), None);
    }

    #[test]
    fn test_flat_price_becomes_single_tier() {
        let draft = ProductInput {
            name: Some(" Cola ".to_string()),
            price: Some(Decimal::from(2)),
            ..ProductInput::default()
        }
        .validate()
        .unwrap();
        assert_eq!(draft.name, "Cola");
        assert!(draft.available);
        assert_eq!(draft.price_ranges.len(), 1);
        assert!(draft.price_ranges[0].contains(500));
    }

    #[test]
    fn test_product_validation_errors() {
        assert!(ProductInput::default().validate().is_err());

        let no_price = ProductInput {
            name: Some("Soup".to_string()),
            ..ProductInput::default()
        };
        assert!(no_price.validate().is_err());

        let inverted: ProductInput = serde_json::from_value(json!({
            "name": "Soup",
            "price_ranges": [{"price": 3, "min": 5, "max": 2}]
        }))
        .unwrap();
        assert!(inverted.validate().is_err());

        let negative: ProductInput = serde_json::from_value(json!({"name": "Soup", "price": -1})).unwrap();
        assert!(negative.validate().is_err());

        let absurd: ProductInput = serde_json::from_value(json!({"name": "Soup", "price": 1_000_000})).unwrap();
        assert!(absurd.validate().is_err());
    }

    #[test]
    fn test_stats_period_parse() {
        assert_eq!("week".parse::<StatsPeriod>().unwrap(), StatsPeriod::Week);
        assert_eq!("MONTH".parse::<StatsPeriod>().unwrap(), StatsPeriod::Month);
        assert!("year".parse::<StatsPeriod>().is_err());
        assert_eq!(StatsPeriod::default().as_ref(), "day");
    }
}
