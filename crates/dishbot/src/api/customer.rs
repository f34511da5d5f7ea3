//! Customer endpoints used by the ordering WebApp

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use dishcore::config::limits::CUSTOMER_ORDERS;
use dishcore::order::{parse_meal_text, NewOrder, OrderItem};
use dishcore::pricing::{check_items, quote, resolve_prices, Quote};
use dishcore::storage::place_order as store_order;
use dishcore::Location;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{parse_body, ApiError, ApiResult};
use crate::state::{AppState, SharedState};
use crate::telegram::webapp_auth::validate_telegram_webapp_data;

pub const INIT_DATA_HEADER: &str = "X-Telegram-Init-Data";

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PlaceOrderRequest {
    pub meal: Option<String>,
    pub items: Option<Vec<OrderItem>>,
    pub user: Option<Customer>,
    pub location: Option<Value>,
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Customer {
    pub id: Option<i64>,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

impl Customer {
    /// How the customer is shown in the admin chat
    fn label(&self, user_id: i64) -> String {
        let mut label = self.first_name.clone().unwrap_or_default();
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            if !label.is_empty() {
                label.push(' ');
            }
            label.push('@');
            label.push_str(username);
        }
        if label.is_empty() {
            user_id.to_string()
        } else {
            format!("{} ({})", label, user_id)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

impl UserQuery {
    fn user_id(&self) -> ApiResult<i64> {
        let raw = self
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing user_id".to_string()))?;
        raw.parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid user_id '{}'", raw)))
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteOrderRequest {
    pub order_id: Option<String>,
}

// ============================================================================
// AUTH
// ============================================================================

/// Checks Telegram init data when present (or required) against `user_id`
pub fn authorize_customer(headers: &HeaderMap, state: &AppState, user_id: i64) -> ApiResult<()> {
    let init_data = headers.get(INIT_DATA_HEADER).and_then(|v| v.to_str().ok());

    match init_data {
        Some(init_data) => {
            let verified = validate_telegram_webapp_data(
                init_data,
                state.settings.telegram_bot_token.expose_secret(),
                Utc::now(),
            )
            .map_err(|e| ApiError::Unauthorized(format!("Invalid init data: {}", e)))?;

            if verified != user_id {
                log::warn!("Init data for user {} used for user {}", verified, user_id);
                return Err(ApiError::Unauthorized("Init data belongs to another user".to_string()));
            }
            Ok(())
        }
        None if state.settings.webapp_auth_required => {
            Err(ApiError::Unauthorized("Missing Telegram init data".to_string()))
        }
        None => Ok(()),
    }
}

// ============================================================================
// ITEMS
// ============================================================================

/// Items from the request, else parsed from the `meal` text, within bounds
pub(crate) fn collect_items(items: Option<Vec<OrderItem>>, meal: Option<String>) -> ApiResult<Vec<OrderItem>> {
    let items = match (items, meal) {
        (Some(items), _) if !items.is_empty() => items,
        (_, Some(meal)) => parse_meal_text(&meal),
        _ => Vec::new(),
    };
    if items.is_empty() {
        return Err(ApiError::BadRequest("Missing meal or items".to_string()));
    }
    check_items(&items)?;
    Ok(items)
}

/// Prices `items` against the current catalog
pub(crate) async fn price_items(state: &AppState, mut items: Vec<OrderItem>) -> ApiResult<(Vec<OrderItem>, Quote)> {
    let catalog = state.store.list_products().await?;
    resolve_prices(&mut items, &catalog)?;
    let quote = quote(&items)?;
    Ok((items, quote))
}

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /api/order
pub async fn place_order(State(state): State<SharedState>, headers: HeaderMap, body: Bytes) -> ApiResult<Json<Value>> {
    let request: PlaceOrderRequest = parse_body(&body)?;

    let customer = request.user.unwrap_or_default();
    let user_id = customer
        .id
        .ok_or_else(|| ApiError::BadRequest("Missing user.id".to_string()))?;
    let location = request
        .location
        .as_ref()
        .and_then(Location::from_value)
        .ok_or_else(|| ApiError::BadRequest("Missing location".to_string()))?;

    let items = collect_items(request.items, request.meal)?;

    authorize_customer(&headers, &state, user_id)?;

    let (items, quote) = price_items(&state, items).await?;

    let new = NewOrder {
        user_id,
        items,
        comment: request.comment.unwrap_or_default().trim().to_string(),
        location,
        total: quote.total,
    };
    let order = store_order(state.store.as_ref(), new, Utc::now()).await?;

    if !state.notifier.notify_new_order(&order, &customer.label(user_id)).await {
        log::warn!("Order {} placed but the admin chat was not notified", order.order_id);
    }

    Ok(Json(json!({ "success": true, "orderId": order.order_id })))
}

/// GET /api/orders?user_id=
pub async fn list_orders(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Value>> {
    let user_id = query.user_id()?;
    authorize_customer(&headers, &state, user_id)?;

    let orders = state.store.orders_for_user(user_id, CUSTOMER_ORDERS).await?;
    Ok(Json(json!({ "orders": orders })))
}

/// GET /api/orders/{order_id}?user_id=
pub async fn get_order(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(order_id): Path<String>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Value>> {
    let user_id = query.user_id()?;
    authorize_customer(&headers, &state, user_id)?;

    let order = state
        .store
        .get_order(&order_id)
        .await?
        .filter(|order| order.user_id == user_id && !order.deleted)
        .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", order_id)))?;

    Ok(Json(json!({ "order": order })))
}

/// DELETE /api/orders?user_id=
pub async fn delete_order(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<UserQuery>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let user_id = query.user_id()?;
    authorize_customer(&headers, &state, user_id)?;

    let request: DeleteOrderRequest = parse_body(&body)?;
    let order_id = request
        .order_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing order_id".to_string()))?;

    if !state.store.soft_delete_order(&order_id, user_id).await? {
        return Err(ApiError::NotFound(format!("Order {} not found", order_id)));
    }
    log::info!("Order {} hidden by user {}", order_id, user_id);
    Ok(Json(json!({ "ok": true })))
}
