//! HTTP API: customer endpoints, admin dashboard endpoints and the bot webhook

pub mod admin_messages;
pub mod admin_orders;
pub mod admin_users;
pub mod customer;
pub mod invoice;
pub mod products;
pub mod route;
pub mod session;
pub mod upload;

use axum::{
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use dishcore::AppError;
use serde::de::DeserializeOwned;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::state::SharedState;
use crate::telegram::webhook;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Upstream { service: &'static str, details: String },
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            ApiError::Upstream { service, details } => {
                log::warn!("{} request failed: {}", service, details);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": format!("{} request failed", service), "details": details }),
                )
            }
            ApiError::Internal(msg) => {
                log::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal server error" }))
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => ApiError::BadRequest(msg),
            AppError::NotFound(what) => ApiError::NotFound(format!("Not found: {}", what)),
            AppError::Transition(e) => ApiError::Conflict(e.to_string()),
            AppError::Upstream { service, details } => ApiError::Upstream { service, details },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Parses a JSON request body after authorization has passed
pub fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    if body.is_empty() {
        return serde_json::from_str("{}").map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Builds the full HTTP router
pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let static_dir = state.settings.static_dir.clone();

    let app = Router::new()
        .route("/api/health", get(health_check))
        // Customer
        .route("/api/order", post(customer::place_order))
        .route("/api/orders", get(customer::list_orders).delete(customer::delete_order))
        .route("/api/orders/{order_id}", get(customer::get_order))
        .route("/api/create-invoice", post(invoice::create_invoice))
        // Admin
        .route("/api/admin/login", post(session::login))
        .route(
            "/api/admin-orders",
            get(admin_orders::list_orders)
                .post(admin_orders::update_order)
                .delete(admin_orders::delete_order)
                .patch(admin_orders::reschedule_orders),
        )
        .route(
            "/api/products",
            get(products::list_products)
                .post(products::create_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/api/products-stats", get(products::product_stats))
        .route(
            "/api/admin-users",
            get(admin_users::list_admin_users)
                .post(admin_users::upsert_admin_user)
                .delete(admin_users::delete_admin_user),
        )
        .route(
            "/api/admin-messages",
            get(admin_messages::list_messages).post(admin_messages::post_message),
        )
        .route("/api/optimize-route", post(route::optimize_route))
        .route("/api/upload", post(upload::upload_image))
        // Telegram
        .route("/api/webhook", post(webhook::handle_webhook))
        .layer(cors)
        .with_state(state);

    match static_dir {
        Some(dir) => {
            log::info!("Serving static files from {}", dir);
            app.fallback_service(ServeDir::new(dir))
        }
        None => app,
    }
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "dishdash" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dishcore::order::{OrderStatus, TransitionError};

    #[test]
    fn test_core_errors_map_to_statuses() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("order 1_1".into()), StatusCode::NOT_FOUND),
            (
                AppError::Transition(TransitionError::Rejected {
                    from: OrderStatus::Arrived,
                    to: OrderStatus::Pending,
                }),
                StatusCode::CONFLICT,
            ),
            (AppError::upstream("Directions", "OVER_QUERY_LIMIT"), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_parse_body_treats_empty_as_object() {
        #[derive(serde::Deserialize)]
        struct Body {
            order_id: Option<String>,
        }
        let parsed: Body = parse_body(&Bytes::new()).unwrap();
        assert!(parsed.order_id.is_none());
        assert!(parse_body::<Body>(&Bytes::from_static(b"not json")).is_err());
    }
}
