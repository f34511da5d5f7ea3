//! Telegram Payments invoice links for a priced cart

use chrono::{DateTime, Utc};
use dishcore::config::payments::{INVOICE_TITLE, MAX_DESCRIPTION_CHARS};
use dishcore::order::OrderItem;
use dishcore::{AppError, AppResult};
use secrecy::{ExposeSecret, SecretString};
use teloxide::prelude::*;
use teloxide::types::LabeledPrice;

/// What the customer is asked to pay
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub description: String,
    pub payload: String,
    /// Smallest currency unit, e.g. cents
    pub amount: u32,
}

impl InvoiceDraft {
    pub fn new(items: &[OrderItem], amount: u32, now: DateTime<Utc>) -> Self {
        let description = items.iter().map(OrderItem::label).collect::<Vec<_>>().join(", ");
        Self {
            description: description.chars().take(MAX_DESCRIPTION_CHARS).collect(),
            payload: format!("order-{}", now.timestamp_millis()),
            amount,
        }
    }
}

/// Asks Telegram for an invoice link the WebApp can open
pub async fn create_invoice_link(
    bot: &Bot,
    provider_token: &SecretString,
    currency: &str,
    draft: &InvoiceDraft,
) -> AppResult<String> {
    let link = bot
        .create_invoice_link(
            INVOICE_TITLE,
            draft.description.clone(),
            draft.payload.clone(),
            currency,
            vec![LabeledPrice::new("Order", draft.amount)],
        )
        .provider_token(provider_token.expose_secret())
        .await
        .map_err(|e| AppError::upstream("Telegram", e.to_string()))?;

    log::info!("Invoice {} created for {} {}", draft.payload, draft.amount, currency);
    Ok(link)
}
