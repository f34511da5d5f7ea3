//! Admin sessions
//!
//! A dashboard password is exchanged once for a signed bearer token:
//! `<role>.<expires_unix>.<hex hmac-sha256(secret, "<role>.<expires_unix>")>`.
//! Handlers call [`require_role`] before touching anything.

use std::time::Duration;

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use strum::{Display, EnumString};
use thiserror::Error;

use crate::api::{parse_body, ApiError, ApiResult};
use crate::state::{AppState, SharedState};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    MainAdmin,
}

impl Role {
    /// `main_admin` may do everything `admin` may
    pub fn satisfies(self, required: Role) -> bool {
        self == required || self == Role::MainAdmin
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("Malformed session token")]
    Malformed,
    #[error("Invalid session token")]
    BadSignature,
    #[error("Session expired")]
    Expired,
    #[error("Session key rejected")]
    Key,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionToken {
    pub token: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionKeys {
    secret: SecretString,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    fn mac(&self) -> Result<HmacSha256, SessionError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes()).map_err(|_| SessionError::Key)
    }

    /// Signs a token for `role`, valid for the configured lifetime
    pub fn issue(&self, role: Role, now: DateTime<Utc>) -> Result<SessionToken, SessionError> {
        let ttl = chrono::Duration::from_std(self.ttl).map_err(|_| SessionError::Key)?;
        let expires_at = now + ttl;
        let payload = format!("{}.{}", role, expires_at.timestamp());

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(SessionToken {
            token: format!("{}.{}", payload, signature),
            role,
            expires_at,
        })
    }

    /// Checks signature and expiry, returning the token's role
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Role, SessionError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(SessionError::Malformed)?;
        let (role, expires) = payload.split_once('.').ok_or(SessionError::Malformed)?;
        let role: Role = role.parse().map_err(|_| SessionError::Malformed)?;
        let expires: i64 = expires.parse().map_err(|_| SessionError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| SessionError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| SessionError::BadSignature)?;

        if expires <= now.timestamp() {
            return Err(SessionError::Expired);
        }
        Ok(role)
    }

    /// Constant-time password comparison
    pub fn password_matches(&self, candidate: &str, expected: &SecretString) -> bool {
        let Ok(mut expected_mac) = self.mac() else {
            return false;
        };
        expected_mac.update(expected.expose_secret().as_bytes());
        let expected_tag = expected_mac.finalize().into_bytes();

        let Ok(mut candidate_mac) = self.mac() else {
            return false;
        };
        candidate_mac.update(candidate.as_bytes());
        candidate_mac.verify_slice(&expected_tag).is_ok()
    }
}

/// Checks the bearer token and that its role covers `required`
///
/// Missing or invalid tokens give 401, a valid token with too little
/// privilege gives 403.
pub fn require_role(headers: &HeaderMap, state: &AppState, required: Role) -> ApiResult<Role> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing admin session".to_string()))?;

    let role = state
        .sessions
        .verify(token, Utc::now())
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    if !role.satisfies(required) {
        return Err(ApiError::Forbidden(format!("{} role required", required)));
    }
    Ok(role)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: Option<String>,
}

/// POST /api/admin/login
pub async fn login(State(state): State<SharedState>, body: Bytes) -> ApiResult<Json<SessionToken>> {
    let request: LoginRequest = parse_body(&body)?;
    let password = request.password.unwrap_or_default();

    let settings = &state.settings;
    let role = if state.sessions.password_matches(&password, &settings.main_admin_password) {
        Role::MainAdmin
    } else if state.sessions.password_matches(&password, &settings.admin_password) {
        Role::Admin
    } else {
        log::warn!("Admin login refused: wrong password");
        return Err(ApiError::Unauthorized("Incorrect password".to_string()));
    };

    let session = state
        .sessions
        .issue(role, Utc::now())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    log::info!("Admin session issued for role {}", role);
    Ok(Json(session))
}
