use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use dishcore::geo::parse_location;
use dishcore::route::{plan_route, RoutePlan, RouteStrategy};
use serde::Deserialize;
use serde_json::Value;

use crate::api::session::{require_role, Role};
use crate::api::{parse_body, ApiError, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct OptimizeRouteRequest {
    pub order_ids: Option<Vec<String>>,
    pub driver_location: Option<Value>,
    pub strategy: Option<String>,
}

/// POST /api/optimize-route
pub async fn optimize_route(State(state): State<SharedState>, headers: HeaderMap, body: Bytes) -> ApiResult<Json<RoutePlan>> {
    require_role(&headers, &state, Role::Admin)?;
    let request: OptimizeRouteRequest = parse_body(&body)?;

    let (Some(order_ids), Some(driver)) = (request.order_ids, request.driver_location) else {
        return Err(ApiError::BadRequest("Missing order_ids or driver_location".to_string()));
    };
    let origin = parse_location(&driver).ok_or_else(|| ApiError::BadRequest("Invalid driver_location".to_string()))?;

    let strategy = match request.strategy.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse::<RouteStrategy>()
            .map_err(|_| ApiError::BadRequest(format!("Unknown strategy '{}'", raw)))?,
        None => RouteStrategy::default(),
    };

    let orders = state.store.orders_by_ids(&order_ids).await?;
    let plan = plan_route(origin, &order_ids, &orders, strategy, state.directions.as_ref()).await;
    log::info!(
        "Route for {} order(s) planned with {}: {} stop(s)",
        order_ids.len(),
        plan.strategy,
        plan.route.len()
    );
    Ok(Json(plan))
}
