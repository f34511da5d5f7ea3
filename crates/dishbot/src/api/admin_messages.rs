//! Dashboard chat between admins

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use dishcore::catalog::NewAdminMessage;
use dishcore::config::limits::ADMIN_MESSAGES;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::session::{require_role, Role};
use crate::api::{parse_body, ApiError, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct PostMessageRequest {
    pub user_id: Option<i64>,
    pub nickname: Option<String>,
    pub message: Option<String>,
}

/// GET /api/admin-messages: the latest messages, oldest first
pub async fn list_messages(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    require_role(&headers, &state, Role::Admin)?;
    let messages = state.store.recent_messages(ADMIN_MESSAGES).await?;
    Ok(Json(json!({ "messages": messages })))
}

/// POST /api/admin-messages
pub async fn post_message(State(state): State<SharedState>, headers: HeaderMap, body: Bytes) -> ApiResult<Json<Value>> {
    require_role(&headers, &state, Role::Admin)?;
    let request: PostMessageRequest = parse_body(&body)?;

    let (Some(user_id), Some(message)) = (
        request.user_id,
        request.message.map(|m| m.trim().to_string()).filter(|m| !m.is_empty()),
    ) else {
        return Err(ApiError::BadRequest("Missing user_id or message".to_string()));
    };

    let saved = state
        .store
        .add_message(&NewAdminMessage {
            user_id,
            nickname: request.nickname.filter(|n| !n.trim().is_empty()),
            message,
        })
        .await?;
    log::debug!("Admin message {} from {}", saved.id, user_id);
    Ok(Json(json!({ "ok": true, "message": saved })))
}
