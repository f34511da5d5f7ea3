//! Product catalog: public listing, main-admin mutations, order statistics

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use dishcore::catalog::{ProductInput, StatsPeriod};
use dishcore::config::limits::PRODUCT_STATS;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::session::{require_role, Role};
use crate::api::{parse_body, ApiError, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct ProductId {
    pub id: Option<i64>,
}

impl ProductId {
    fn required(self) -> ApiResult<i64> {
        self.id.ok_or_else(|| ApiError::BadRequest("Missing id".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub period: Option<String>,
}

/// GET /api/products
pub async fn list_products(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let products = state.store.list_products().await?;
    Ok(Json(json!({ "products": products })))
}

/// POST /api/products
pub async fn create_product(State(state): State<SharedState>, headers: HeaderMap, body: Bytes) -> ApiResult<Json<Value>> {
    require_role(&headers, &state, Role::MainAdmin)?;
    let draft = parse_body::<ProductInput>(&body)?.validate()?;

    let product = state.store.create_product(&draft).await?;
    log::info!("Product {} '{}' created", product.id, product.name);
    Ok(Json(json!({ "product": product })))
}

/// PUT /api/products
pub async fn update_product(State(state): State<SharedState>, headers: HeaderMap, body: Bytes) -> ApiResult<Json<Value>> {
    require_role(&headers, &state, Role::MainAdmin)?;
    let id = parse_body::<ProductId>(&body)?.required()?;
    let draft = parse_body::<ProductInput>(&body)?.validate()?;

    let product = state
        .store
        .update_product(id, &draft)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {} not found", id)))?;
    log::info!("Product {} updated", id);
    Ok(Json(json!({ "product": product })))
}

/// DELETE /api/products
pub async fn delete_product(State(state): State<SharedState>, headers: HeaderMap, body: Bytes) -> ApiResult<Json<Value>> {
    require_role(&headers, &state, Role::MainAdmin)?;
    let id = parse_body::<ProductId>(&body)?.required()?;

    if !state.store.delete_product(id).await? {
        return Err(ApiError::NotFound(format!("Product {} not found", id)));
    }
    log::info!("Product {} deleted", id);
    Ok(Json(json!({ "ok": true })))
}

/// GET /api/products-stats?period=day|week|month
pub async fn product_stats(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<Value>> {
    require_role(&headers, &state, Role::Admin)?;

    let period = match query.period.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(raw) => raw
            .parse::<StatsPeriod>()
            .map_err(|_| ApiError::BadRequest(format!("Unknown period '{}'", raw)))?,
        None => StatsPeriod::default(),
    };

    let stats = state.store.product_stats(period, PRODUCT_STATS).await?;
    Ok(Json(json!({ "stats": stats })))
}
