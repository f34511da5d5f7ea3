//! Telegram users allowed to press driver buttons, and their delivery stats

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::session::{require_role, Role};
use crate::api::{parse_body, ApiError, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct AdminUsersQuery {
    pub stats: Option<String>,
}

impl AdminUsersQuery {
    fn wants_stats(&self) -> bool {
        self.stats
            .as_deref()
            .is_some_and(|v| !matches!(v.trim(), "" | "0" | "false"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminUserRequest {
    pub user_id: Option<i64>,
    pub nickname: Option<String>,
}

/// GET /api/admin-users, or `?stats=true` for driver statistics
pub async fn list_admin_users(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<AdminUsersQuery>,
) -> ApiResult<Json<Value>> {
    require_role(&headers, &state, Role::Admin)?;

    if query.wants_stats() {
        let stats = state.store.driver_stats().await?;
        return Ok(Json(json!({ "stats": stats })));
    }
    let users = state.store.list_admins().await?;
    Ok(Json(json!({ "users": users })))
}

/// POST /api/admin-users
pub async fn upsert_admin_user(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    require_role(&headers, &state, Role::MainAdmin)?;
    let request: AdminUserRequest = parse_body(&body)?;
    let user_id = request
        .user_id
        .ok_or_else(|| ApiError::BadRequest("Missing user_id".to_string()))?;
    let nickname = request.nickname.as_deref().map(str::trim).filter(|n| !n.is_empty());

    state.store.upsert_admin(user_id, nickname).await?;
    log::info!("Admin user {} saved", user_id);
    Ok(Json(json!({ "ok": true })))
}

/// DELETE /api/admin-users
pub async fn delete_admin_user(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    require_role(&headers, &state, Role::MainAdmin)?;
    let request: AdminUserRequest = parse_body(&body)?;
    let user_id = request
        .user_id
        .ok_or_else(|| ApiError::BadRequest("Missing user_id".to_string()))?;

    if state.store.remove_admin(user_id).await? {
        log::info!("Admin user {} removed", user_id);
    } else {
        log::debug!("Admin user {} was not registered", user_id);
    }
    Ok(Json(json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_flag() {
        let query = |v: Option<&str>| AdminUsersQuery {
            stats: v.map(str::to_string),
        };
        assert!(query(Some("true")).wants_stats());
        assert!(query(Some("1")).wants_stats());
        assert!(!query(Some("false")).wants_stats());
        assert!(!query(Some("")).wants_stats());
        assert!(!query(None).wants_stats());
    }
}
