//! Delivery route planning
//!
//! Two strategies: nearest neighbour over haversine distance (always
//! available, no ETAs) and Google Directions with optimized waypoints (needs an
//! API key, gives per-stop ETAs). Directions failures fall back to the greedy
//! route.

use itertools::Itertools;
use serde::Serialize;
use strum::{Display, EnumString};

use crate::core::config::limits::MAX_DIRECTIONS_WAYPOINTS;
use crate::geo::{haversine_km, Coordinates};
use crate::maps::DirectionsClient;
use crate::order::Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RouteStrategy {
    Greedy,
    #[default]
    Directions,
}

/// An order that can be routed to
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStop {
    pub order_id: String,
    pub location: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    /// Order ids in visiting order
    pub route: Vec<String>,
    /// Cumulative minutes from the driver to each stop, aligned with `route`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etas: Option<Vec<u32>>,
    /// Requested orders that are unknown or have no usable location
    pub unlocated: Vec<String>,
    /// Strategy that produced `route`
    pub strategy: RouteStrategy,
}

/// Nearest-neighbour ordering starting at `origin`
///
/// Deterministic: on equal distance the stop listed first wins.
pub fn greedy_route(origin: Coordinates, stops: &[RouteStop]) -> Vec<String> {
    if stops.len() <= 1 {
        return stops.iter().map(|s| s.order_id.clone()).collect();
    }

    let mut remaining: Vec<&RouteStop> = stops.iter().collect();
    let mut route = Vec::with_capacity(stops.len());
    let mut current = origin;

    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_km = f64::INFINITY;
        for (i, stop) in remaining.iter().enumerate() {
            let km = haversine_km(current, stop.location);
            if km < best_km {
                best = i;
                best_km = km;
            }
        }
        let next = remaining.remove(best);
        current = next.location;
        route.push(next.order_id.clone());
    }

    route
}

/// Splits requested orders into routable stops and the rest
///
/// Keeps the requested order and drops duplicate ids.
pub fn collect_stops(requested: &[String], orders: &[Order]) -> (Vec<RouteStop>, Vec<String>) {
    let mut stops = Vec::new();
    let mut unlocated = Vec::new();

    for order_id in requested.iter().unique() {
        let location = orders
            .iter()
            .find(|o| &o.order_id == order_id)
            .and_then(|o| o.location.coordinates());
        match location {
            Some(location) => stops.push(RouteStop {
                order_id: order_id.clone(),
                location,
            }),
            None => unlocated.push(order_id.clone()),
        }
    }

    (stops, unlocated)
}

/// Plans a delivery run for `requested` orders starting at `origin`
pub async fn plan_route(
    origin: Coordinates,
    requested: &[String],
    orders: &[Order],
    strategy: RouteStrategy,
    directions: Option<&DirectionsClient>,
) -> RoutePlan {
    let (stops, unlocated) = collect_stops(requested, orders);
    if !unlocated.is_empty() {
        log::info!("Route: {} order(s) without a usable location: {:?}", unlocated.len(), unlocated);
    }

    if strategy == RouteStrategy::Directions && stops.len() > 1 {
        match directions {
            Some(_) if stops.len() > MAX_DIRECTIONS_WAYPOINTS => {
                log::warn!(
                    "Route: {} stops exceed the Directions limit of {}, using greedy",
                    stops.len(),
                    MAX_DIRECTIONS_WAYPOINTS
                );
            }
            Some(client) => {
                let points: Vec<Coordinates> = stops.iter().map(|s| s.location).collect();
                match client.optimize(origin, &points).await {
                    Ok(legs) => {
                        let route = legs.order.iter().map(|&i| stops[i].order_id.clone()).collect();
                        return RoutePlan {
                            route,
                            etas: Some(cumulative_minutes(&legs.leg_seconds, stops.len())),
                            unlocated,
                            strategy: RouteStrategy::Directions,
                        };
                    }
                    Err(e) => log::warn!("Route: Directions failed, using greedy: {}", e),
                }
            }
            None => log::warn!("Route: GOOGLE_MAPS_API_KEY not set, using greedy"),
        }
    }

    RoutePlan {
        route: greedy_route(origin, &stops),
        etas: None,
        unlocated,
        strategy: RouteStrategy::Greedy,
    }
}

/// Running total of leg durations in minutes, rounded up, at least one per stop
fn cumulative_minutes(leg_seconds: &[u64], stops: usize) -> Vec<u32> {
    leg_seconds
        .iter()
        .take(stops)
        .scan(0u64, |total, secs| {
            *total += secs;
            Some(*total)
        })
        .map(|secs| u32::try_from(secs.div_ceil(60)).unwrap_or(u32::MAX).max(1))
        .collect()
}
