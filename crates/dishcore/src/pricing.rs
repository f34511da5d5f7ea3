//! Server-side order pricing
//!
//! Clients send quantities; prices come from the catalog tiers. The bulk
//! discount is 10% per unit beyond the first, capped at 30%.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::catalog::Product;
use crate::core::config::limits::{MAX_ITEM_PRICE, MAX_ITEM_QTY, MAX_ORDER_ITEMS};
use crate::core::error::{AppError, AppResult};
use crate::order::{serialize_money, OrderItem};

const DISCOUNT_STEP_PERCENT: u32 = 10;
const MAX_DISCOUNT_PERCENT: u32 = 30;

/// Price breakdown of an order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    #[serde(serialize_with = "serialize_money")]
    pub subtotal: Decimal,
    /// Fraction of the subtotal taken off, e.g. `0.2`
    pub discount_rate: Decimal,
    #[serde(serialize_with = "serialize_money")]
    pub discount: Decimal,
    #[serde(serialize_with = "serialize_money")]
    pub total: Decimal,
}

impl Quote {
    /// Total in the currency's smallest unit (cents), as Telegram invoices expect
    pub fn minor_units(&self) -> AppResult<u32> {
        (self.total * Decimal::ONE_HUNDRED)
            .round()
            .to_u32()
            .ok_or_else(|| AppError::Validation(format!("Total {} cannot be invoiced", self.total)))
    }
}

/// Rejects line items outside the accepted bounds
///
/// Quantities must be `1..=MAX_ITEM_QTY`; a client price, when sent, must be
/// `0..=MAX_ITEM_PRICE`.
pub fn check_items(items: &[OrderItem]) -> AppResult<()> {
    if items.len() > MAX_ORDER_ITEMS {
        return Err(AppError::Validation(format!(
            "Too many items: {} (at most {})",
            items.len(),
            MAX_ORDER_ITEMS
        )));
    }

    let max_price = Decimal::from(MAX_ITEM_PRICE);
    for item in items {
        if item.name.trim().is_empty() || item.qty == 0 || item.qty > MAX_ITEM_QTY {
            return Err(AppError::Validation(format!("Invalid item '{}' x{}", item.name, item.qty)));
        }
        if let Some(price) = item.price {
            if price.is_sign_negative() || price > max_price {
                return Err(AppError::Validation(format!("Invalid price {} for '{}'", price, item.name)));
            }
        }
    }
    Ok(())
}

/// Bulk discount for a total quantity
pub fn bulk_discount_rate(total_qty: u32) -> Decimal {
    if total_qty < 2 {
        return Decimal::ZERO;
    }
    let percent = (DISCOUNT_STEP_PERCENT.saturating_mul(total_qty - 1)).min(MAX_DISCOUNT_PERCENT);
    Decimal::new(i64::from(percent), 2)
}

/// Fills in catalog prices and emoji
///
/// Items are matched to products by id, else by name (case-insensitive).
/// The catalog tier price replaces whatever the client sent; items with no
/// catalog price keep the client price. A matched product that is switched
/// off fails the whole order.
pub fn resolve_prices(items: &mut [OrderItem], catalog: &[Product]) -> AppResult<()> {
    for item in items.iter_mut() {
        let product = catalog
            .iter()
            .find(|p| item.id == Some(p.id))
            .or_else(|| catalog.iter().find(|p| p.name.eq_ignore_ascii_case(item.name.trim())));

        let Some(product) = product else {
            log::debug!("No catalog entry for '{}', keeping client price", item.name);
            continue;
        };
        if !product.available {
            return Err(AppError::Validation(format!("'{}' is not available", product.name)));
        }

        item.id = Some(product.id);
        if let Some(price) = product.unit_price(item.qty) {
            item.price = Some(price);
        }
        if item.emoji.is_none() {
            item.emoji = product.emoji.clone();
        }
    }
    Ok(())
}

/// Totals for already priced items; unpriced items count as free
pub fn quote(items: &[OrderItem]) -> AppResult<Quote> {
    let overflow = || AppError::Validation("Order total is out of range".to_string());

    let subtotal = items.iter().try_fold(Decimal::ZERO, |sum, item| {
        item.price
            .unwrap_or(Decimal::ZERO)
            .checked_mul(Decimal::from(item.qty))
            .and_then(|line| sum.checked_add(line))
            .ok_or_else(overflow)
    })?;
    let total_qty = items.iter().map(|item| item.qty).fold(0u32, u32::saturating_add);
    let discount_rate = bulk_discount_rate(total_qty);
    let discount = round_money(subtotal.checked_mul(discount_rate).ok_or_else(overflow)?);
    let total = round_money(subtotal.checked_sub(discount).ok_or_else(overflow)?);

    Ok(Quote {
        subtotal: round_money(subtotal),
        discount_rate,
        discount,
        total,
    })
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
