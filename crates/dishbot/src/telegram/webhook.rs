//! Telegram webhook: driver buttons, shared locations and `/start`
//!
//! Telegram retries any update that is not acknowledged, so the handler
//! answers `{ok:true}` whatever happens and only logs failures.

use axum::{body::Bytes, extract::State, Json};
use chrono::Utc;
use dishcore::geo::eta_minutes;
use dishcore::order::notice::{driver_location_notice, status_notice};
use dishcore::order::{apply, OrderEvent, Transition, TransitionError};
use dishcore::{AppResult, Coordinates, Order, OrderStatus};
use lazy_regex::regex_captures;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::AppState;
use crate::state::SharedState;
use crate::telegram::callback::{parse_callback, CallbackAction, OrderCallback};
use crate::telegram::keyboard::{order_keyboard, webapp_keyboard};

// ============================================================================
// UPDATE PAYLOAD
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i32,
    pub from: Option<Sender>,
    pub chat: Chat,
    pub text: Option<String>,
    pub location: Option<SharedLocation>,
    pub reply_to_message: Option<Box<IncomingMessage>>,
}

#[derive(Debug, Deserialize)]
pub struct Sender {
    pub id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SharedLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: Sender,
    pub data: Option<String>,
    pub message: Option<IncomingMessage>,
}

// ============================================================================
// HANDLER
// ============================================================================

/// POST /api/webhook
pub async fn handle_webhook(State(state): State<SharedState>, body: Bytes) -> Json<Value> {
    match serde_json::from_slice::<Update>(&body) {
        Ok(update) => {
            if let Err(e) = dispatch(&state, update).await {
                log::error!("Webhook update failed: {}", e);
            }
        }
        Err(e) => log::warn!("Ignoring malformed webhook update: {}", e),
    }
    Json(json!({ "ok": true }))
}

async fn dispatch(state: &AppState, update: Update) -> AppResult<()> {
    if let Some(query) = update.callback_query {
        return handle_callback(state, query).await;
    }
    if let Some(message) = update.message {
        return handle_message(state, message).await;
    }
    log::debug!("Update {} carries nothing we handle", update.update_id);
    Ok(())
}

/// Owner or a registered admin
async fn is_authorized(state: &AppState, user_id: i64) -> bool {
    if state.settings.owner_id == Some(user_id) {
        return true;
    }
    match state.store.is_admin(user_id).await {
        Ok(authorized) => authorized,
        Err(e) => {
            log::error!("Admin lookup for {} failed: {}", user_id, e);
            false
        }
    }
}

// ============================================================================
// BUTTONS
// ============================================================================

async fn handle_callback(state: &AppState, query: CallbackQuery) -> AppResult<()> {
    let sender = query.from.id;
    if !is_authorized(state, sender).await {
        log::warn!("Callback {} from unauthorized user {} ignored", query.id, sender);
        return Ok(());
    }

    let Some(OrderCallback { action, order_id }) = query.data.as_deref().and_then(parse_callback) else {
        log::debug!("Unknown callback data {:?}", query.data);
        return Ok(());
    };

    let reply_chat = query
        .message
        .as_ref()
        .map(|m| m.chat.id)
        .unwrap_or_else(|| state.notifier.admin_chat_id());

    let Some(order) = state.store.get_order(&order_id).await? else {
        state
            .notifier
            .send_text(reply_chat, &format!("⚠️ Order {} not found.", order_id))
            .await;
        return Ok(());
    };

    let event = match action {
        CallbackAction::Preparing => OrderEvent::Prepare,
        CallbackAction::Arriving => OrderEvent::Dispatch,
        CallbackAction::Arrived => OrderEvent::Deliver,
        CallbackAction::Eta => {
            let Some(customer) = order.location.coordinates() else {
                state
                    .notifier
                    .send_text(
                        reply_chat,
                        &format!("⚠️ Order {} has no usable location, ETA cannot be calculated.", order_id),
                    )
                    .await;
                return Ok(());
            };
            let origin = order.driver_location.unwrap_or(state.settings.depot);
            OrderEvent::EtaCalculated {
                minutes: eta_minutes(origin, customer),
            }
        }
    };

    let Some(transition) = apply_event(state, &order, &event, reply_chat).await? else {
        return Ok(());
    };
    let updated = &transition.order;

    if let Some(message) = &query.message {
        state
            .notifier
            .update_keyboard(message.chat.id, message.message_id, order_keyboard(&updated.order_id, updated.status))
            .await;
    }

    match event {
        OrderEvent::EtaCalculated { minutes } => {
            state
                .notifier
                .notify_customer(updated, &status_notice(OrderStatus::Eta, Some(minutes)))
                .await;
            state
                .notifier
                .send_text(
                    reply_chat,
                    &format!("ETA calculated: {} min. Press 'Arrived' when you reach the customer.", minutes),
                )
                .await;
        }
        _ if transition.status_changed() => {
            state
                .notifier
                .notify_customer(updated, &status_notice(updated.status, updated.eta_minutes))
                .await;
            if updated.status == OrderStatus::Arrived {
                state.store.record_delivery(sender, Utc::now().date_naive()).await?;
                state.notifier.send_text(reply_chat, "Order marked as arrived.").await;
            }
        }
        _ => log::debug!("Order {} already {}, nothing to announce", updated.order_id, updated.status),
    }

    Ok(())
}

/// Runs the state machine and persists the result
///
/// A refused transition is explained in `reply_chat` and yields `None`.
async fn apply_event(
    state: &AppState,
    order: &Order,
    event: &OrderEvent,
    reply_chat: i64,
) -> AppResult<Option<Transition>> {
    match apply(order, event, state.settings.status_policy, Utc::now()) {
        Ok(transition) => {
            state.store.save_order(&transition.order).await?;
            log::info!(
                "Order {}: {} -> {} via Telegram",
                order.order_id,
                transition.from,
                transition.to()
            );
            Ok(Some(transition))
        }
        Err(TransitionError::Rejected { from, to }) => {
            log::warn!("Order {}: refused {} -> {}", order.order_id, from, to);
            state
                .notifier
                .send_text(
                    reply_chat,
                    &format!("⚠️ Order {} is {}, it cannot be set to {}.", order.order_id, from, to),
                )
                .await;
            Ok(None)
        }
    }
}

// ============================================================================
// MESSAGES
// ============================================================================

async fn handle_message(state: &AppState, message: IncomingMessage) -> AppResult<()> {
    if message.text.as_deref().is_some_and(is_start_command) {
        return send_welcome(state, &message).await;
    }

    let Some(shared) = message.location else {
        return Ok(());
    };
    let Some(sender) = message.from.as_ref().map(|s| s.id) else {
        return Ok(());
    };
    if !is_authorized(state, sender).await {
        log::warn!("Location from unauthorized user {} ignored", sender);
        return Ok(());
    }

    let Some(driver) = Coordinates::checked(shared.latitude, shared.longitude) else {
        log::warn!("Shared location {:?} is out of range", shared);
        return Ok(());
    };

    let replied_id = message
        .reply_to_message
        .as_ref()
        .and_then(|reply| reply.text.as_deref())
        .and_then(order_id_in_text);

    let order = match replied_id {
        Some(order_id) => state.store.get_order(&order_id).await?,
        None => {
            log::info!("Location not sent as a reply, using the latest open order");
            state.store.latest_open_order().await?
        }
    };
    let Some(order) = order else {
        state
            .notifier
            .send_text(message.chat.id, "⚠️ No open order found for this location.")
            .await;
        return Ok(());
    };

    let eta = order.location.coordinates().map(|customer| eta_minutes(driver, customer));
    let event = OrderEvent::DriverLocation {
        location: driver,
        eta_minutes: eta,
    };
    let Some(transition) = apply_event(state, &order, &event, message.chat.id).await? else {
        return Ok(());
    };

    state
        .notifier
        .notify_customer(&transition.order, &driver_location_notice(driver, eta))
        .await;
    state
        .notifier
        .send_text(
            message.chat.id,
            &format!("Location shared with customer for Order ID: {}.", order.order_id),
        )
        .await;

    Ok(())
}

async fn send_welcome(state: &AppState, message: &IncomingMessage) -> AppResult<()> {
    let name = message
        .from
        .as_ref()
        .and_then(|s| s.first_name.as_deref().or(s.username.as_deref()))
        .unwrap_or("there");

    let webapp = state.settings.webapp_url.as_deref().and_then(|raw| match url::Url::parse(raw) {
        Ok(url) => Some(url),
        Err(e) => {
            log::warn!("WEBAPP_URL is not a valid URL: {}", e);
            None
        }
    });

    match webapp {
        Some(url) => {
            state
                .notifier
                .send_with_keyboard(
                    message.chat.id,
                    &format!("👋 Hi {}! Tap the button below to order.", name),
                    webapp_keyboard(url),
                )
                .await;
        }
        None => {
            state
                .notifier
                .send_text(message.chat.id, &format!("👋 Hi {}! Welcome to dishdash.", name))
                .await;
        }
    }
    Ok(())
}

fn is_start_command(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or_default();
    command == "/start" || command.starts_with("/start@")
}

/// Order id quoted in an admin message, e.g. `Order ID: 111_1714564800123`
pub fn order_id_in_text(text: &str) -> Option<String> {
    regex_captures!(r"Order ID:\s*(\d+_\d+)", text).map(|(_, id)| id.to_string())
}
