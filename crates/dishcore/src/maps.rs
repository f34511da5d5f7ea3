//! Google Directions client for multi-stop route optimization

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::geo::Coordinates;

pub const DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Stop order and leg durations chosen by Google
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedLegs {
    /// Indices into the submitted stops, in visiting order
    pub order: Vec<usize>,
    /// Driving time of each leg in seconds, starting at the origin
    pub leg_seconds: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    waypoint_order: Vec<usize>,
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    duration: Option<TextValue>,
    duration_in_traffic: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: u64,
}

pub struct DirectionsClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl DirectionsClient {
    pub fn new(api_key: SecretString) -> AppResult<Self> {
        let http = reqwest::Client::builder().timeout(config::network::timeout()).build()?;
        Ok(Self {
            http,
            api_key,
            base_url: DIRECTIONS_URL.to_string(),
        })
    }

    /// Points the client at another endpoint (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Asks for the fastest round trip from `origin` through every stop
    ///
    /// Uses `optimize:true` waypoints and current traffic. The response must
    /// visit every stop exactly once, anything else is an upstream error.
    pub async fn optimize(&self, origin: Coordinates, stops: &[Coordinates]) -> AppResult<OptimizedLegs> {
        if stops.len() > config::limits::MAX_DIRECTIONS_WAYPOINTS {
            return Err(AppError::Validation(format!(
                "Directions accepts at most {} stops, got {}",
                config::limits::MAX_DIRECTIONS_WAYPOINTS,
                stops.len()
            )));
        }

        let waypoints = std::iter::once("optimize:true".to_string())
            .chain(stops.iter().map(Coordinates::as_query))
            .collect::<Vec<_>>()
            .join("|");
        let origin = origin.as_query();

        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("origin", origin.as_str()),
                ("destination", origin.as_str()),
                ("waypoints", waypoints.as_str()),
                ("departure_time", "now"),
                ("key", self.api_key.expose_secret()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::upstream("Directions", format!("HTTP {}", response.status())));
        }

        let body: DirectionsResponse = response.json().await?;
        if body.status != "OK" {
            let details = match body.error_message {
                Some(message) => format!("{}: {}", body.status, message),
                None => body.status,
            };
            return Err(AppError::upstream("Directions", details));
        }

        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| AppError::upstream("Directions", "no routes returned"))?;

        let mut seen = vec![false; stops.len()];
        let is_permutation = route.waypoint_order.len() == stops.len()
            && route
                .waypoint_order
                .iter()
                .all(|&i| i < seen.len() && !std::mem::replace(&mut seen[i], true));
        if !is_permutation {
            return Err(AppError::upstream(
                "Directions",
                format!("waypoint_order {:?} does not cover {} stops", route.waypoint_order, stops.len()),
            ));
        }

        let leg_seconds = route
            .legs
            .iter()
            .map(|leg| {
                leg.duration_in_traffic
                    .as_ref()
                    .or(leg.duration.as_ref())
                    .map_or(0, |d| d.value)
            })
            .collect();

        Ok(OptimizedLegs {
            order: route.waypoint_order,
            leg_seconds,
        })
    }
}
