//! Dashboard order management

use std::collections::HashMap;

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::Utc;
use dishcore::config::limits::ADMIN_ORDERS;
use dishcore::geo::parse_location;
use dishcore::order::notice::admin_update_notice;
use dishcore::order::{apply, parse_eta_input, AdminEdit, OrderEvent};
use dishcore::{AppError, OrderStatus};
use itertools::Itertools;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::api::session::{require_role, Role};
use crate::api::{parse_body, ApiError, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrderRequest {
    pub order_id: Option<String>,
    pub status: Option<String>,
    pub comment: Option<String>,
    /// `Some(Value::Null)` when the key is sent as `null`
    #[serde(default, deserialize_with = "present")]
    pub eta: Option<Value>,
    pub driver_location: Option<Value>,
    pub admin_note: Option<String>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteOrderRequest {
    pub order_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RescheduleRequest {
    pub order_ids: Option<Value>,
    pub etas: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn required_order_id(order_id: Option<String>) -> ApiResult<String> {
    order_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing order_id".to_string()))
}

/// GET /api/admin-orders
pub async fn list_orders(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    require_role(&headers, &state, Role::Admin)?;

    let orders = state.store.recent_orders(ADMIN_ORDERS).await?;
    let user_ids = orders.iter().map(|o| o.user_id).unique().collect::<Vec<_>>();
    let notes: HashMap<i64, String> = state.store.admin_notes(&user_ids).await?;

    let orders = orders
        .iter()
        .map(|order| {
            let mut value = serde_json::to_value(order)?;
            if let Value::Object(map) = &mut value {
                let note = notes.get(&order.user_id).cloned().unwrap_or_default();
                map.insert("admin_note".to_string(), json!(note));
            }
            Ok(value)
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()
        .map_err(AppError::from)?;

    Ok(Json(json!({ "orders": orders })))
}

/// POST /api/admin-orders
pub async fn update_order(State(state): State<SharedState>, headers: HeaderMap, body: Bytes) -> ApiResult<Json<Value>> {
    require_role(&headers, &state, Role::Admin)?;
    let request: UpdateOrderRequest = parse_body(&body)?;
    let order_id = required_order_id(request.order_id)?;
    let now = Utc::now();

    let status = request
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|label| {
            OrderStatus::parse_label(label).ok_or_else(|| ApiError::BadRequest(format!("Unknown status '{}'", label)))
        })
        .transpose()?;

    let eta_minutes = request.eta.as_ref().map(|eta| parse_eta_input(eta, now)).transpose()?;

    let driver_location = match &request.driver_location {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            parse_location(value).ok_or_else(|| ApiError::BadRequest("Invalid driver_location".to_string()))?,
        ),
    };

    let order = state
        .store
        .get_order(&order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", order_id)))?;

    let edit = AdminEdit {
        status,
        comment: request.comment.clone(),
        eta_minutes,
        driver_location,
    };
    let customer_facing = edit.status.is_some() || edit.comment.is_some() || edit.eta_minutes.is_some();

    let transition =
        apply(&order, &OrderEvent::AdminEdit(edit), state.settings.status_policy, now).map_err(AppError::from)?;
    state.store.save_order(&transition.order).await?;
    log::info!(
        "Order {} updated from dashboard: {} -> {}",
        order_id,
        transition.from,
        transition.to()
    );

    if let Some(note) = &request.admin_note {
        let user_id = request.user_id.unwrap_or(order.user_id);
        state.store.upsert_admin_note(user_id, note).await?;
    }

    if customer_facing {
        let text = admin_update_notice(transition.to(), eta_minutes.flatten(), request.comment.as_deref());
        state.notifier.notify_customer(&transition.order, &text).await;
    }

    Ok(Json(json!({ "ok": true })))
}

/// DELETE /api/admin-orders
pub async fn delete_order(State(state): State<SharedState>, headers: HeaderMap, body: Bytes) -> ApiResult<Json<Value>> {
    require_role(&headers, &state, Role::Admin)?;
    let request: DeleteOrderRequest = parse_body(&body)?;
    let order_id = required_order_id(request.order_id)?;

    if !state.store.delete_order(&order_id).await? {
        return Err(ApiError::NotFound(format!("Order {} not found", order_id)));
    }
    log::info!("Order {} deleted from dashboard", order_id);
    Ok(Json(json!({ "ok": true })))
}

/// PATCH /api/admin-orders
///
/// Every ETA is validated before anything is written.
pub async fn reschedule_orders(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    require_role(&headers, &state, Role::Admin)?;
    let request: RescheduleRequest = parse_body(&body)?;

    let (Some(Value::Array(order_ids)), Some(Value::Array(etas))) = (request.order_ids, request.etas) else {
        return Err(ApiError::BadRequest("Invalid order_ids or etas".to_string()));
    };
    if order_ids.len() != etas.len() {
        return Err(ApiError::BadRequest("Invalid order_ids or etas".to_string()));
    }

    let now = Utc::now();
    let mut schedule = Vec::with_capacity(order_ids.len());
    for (order_id, eta) in order_ids.iter().zip(&etas) {
        let order_id = order_id
            .as_str()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid order id {}", order_id)))?;
        schedule.push((order_id.to_string(), parse_eta_input(eta, now)?));
    }

    let ids = schedule.iter().map(|(id, _)| id.clone()).collect::<Vec<_>>();
    let orders = state.store.orders_by_ids(&ids).await?;

    let mut updated = 0;
    for (order_id, minutes) in schedule {
        let Some(order) = orders.iter().find(|o| o.order_id == order_id) else {
            log::warn!("Reschedule: order {} not found", order_id);
            continue;
        };
        let transition = apply(order, &OrderEvent::EtaRescheduled { minutes }, state.settings.status_policy, now)
            .map_err(AppError::from)?;
        state.store.save_order(&transition.order).await?;
        updated += 1;
    }

    log::info!("Rescheduled {} of {} order(s)", updated, ids.len());
    Ok(Json(json!({ "ok": true, "updated": updated })))
}
