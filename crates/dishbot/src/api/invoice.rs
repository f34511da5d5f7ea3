//! Card payment for a cart, through Telegram Payments

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::Utc;
use dishcore::order::OrderItem;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::customer::{authorize_customer, collect_items, price_items, Customer};
use crate::api::{parse_body, ApiError, ApiResult};
use crate::state::SharedState;
use crate::telegram::invoice::{create_invoice_link, InvoiceDraft};

/// Cart as sent by the WebApp; any client `total` is ignored
#[derive(Debug, Default, Deserialize)]
pub struct CreateInvoiceRequest {
    pub meal: Option<String>,
    pub items: Option<Vec<OrderItem>>,
    pub user: Option<Customer>,
}

/// POST /api/create-invoice
pub async fn create_invoice(State(state): State<SharedState>, headers: HeaderMap, body: Bytes) -> ApiResult<Json<Value>> {
    let request: CreateInvoiceRequest = parse_body(&body)?;
    let items = collect_items(request.items, request.meal)?;

    match request.user.and_then(|user| user.id) {
        Some(user_id) => authorize_customer(&headers, &state, user_id)?,
        None if state.settings.webapp_auth_required => {
            return Err(ApiError::Unauthorized("Missing user.id".to_string()));
        }
        None => {}
    }

    let provider_token = state
        .settings
        .telegram_provider_token
        .as_ref()
        .ok_or_else(|| ApiError::Internal("Payments are not configured (TELEGRAM_PROVIDER_TOKEN)".to_string()))?;

    let (items, quote) = price_items(&state, items).await?;
    let amount = quote.minor_units()?;
    if amount == 0 {
        return Err(ApiError::BadRequest("Nothing to pay for".to_string()));
    }

    let draft = InvoiceDraft::new(&items, amount, Utc::now());
    let slug = create_invoice_link(
        state.notifier.bot(),
        provider_token,
        &state.settings.payment_currency,
        &draft,
    )
    .await?;
    Ok(Json(json!({ "slug": slug })))
}
