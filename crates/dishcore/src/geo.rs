//! Distance, ETA and location parsing
//!
//! Every ETA in the system comes from [`eta_minutes`]: haversine distance at a
//! flat 40 km/h, rounded to whole minutes and never below one minute.

use lazy_regex::regex_captures;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::config::delivery::{AVERAGE_SPEED_KMH, EARTH_RADIUS_KM, MIN_ETA_MINUTES};

/// A point on the map in decimal degrees
///
/// Accepts Telegram's `latitude`/`longitude` spelling on input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Range-checked constructor
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        if lat.is_finite() && lng.is_finite() && lat.abs() <= 90.0 && lng.abs() <= 180.0 {
            Some(Self { lat, lng })
        } else {
            None
        }
    }

    /// Google Maps link pointing at this coordinate
    pub fn maps_link(&self) -> String {
        format!("https://www.google.com/maps?q={},{}", self.lat, self.lng)
    }

    /// `lat,lng` pair as used in Directions API parameters
    pub fn as_query(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

/// Great-circle distance in kilometres
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Driving time estimate in whole minutes
pub fn eta_minutes(from: Coordinates, to: Coordinates) -> u32 {
    let minutes = (haversine_km(from, to) / AVERAGE_SPEED_KMH * 60.0).round();
    // Float-to-int `as` saturates; the distance is bounded by half the Earth's circumference anyway.
    (minutes as u32).max(MIN_ETA_MINUTES)
}

/// Delivery location as submitted by the WebApp
///
/// Either a picked point or free text typed by the customer. Free text may
/// still hold coordinates (a pasted Google Maps link), see [`Location::coordinates`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Point(Coordinates),
    Manual { manual: String },
}

impl Location {
    /// Lenient reading of a location value
    ///
    /// Understands `{lat,lng}` objects (numbers or numeric strings), `{manual: "..."}`
    /// and a JSON string holding either. Any other non-empty string is kept as
    /// manual text.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(inner @ Value::Object(_)) => Self::from_value(&inner),
                _ if raw.trim().is_empty() => None,
                _ => Some(Self::Manual {
                    manual: raw.trim().to_string(),
                }),
            },
            Value::Object(map) => {
                let manual = map
                    .get("manual")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty());
                let lat = map.get("lat").or_else(|| map.get("latitude")).and_then(number_like);
                let lng = map.get("lng").or_else(|| map.get("longitude")).and_then(number_like);
                match (lat, lng, manual) {
                    (Some(lat), Some(lng), manual) if !(is_placeholder(lat, lng) && manual.is_some()) => {
                        Some(Self::Point(Coordinates::new(lat, lng)))
                    }
                    (_, _, Some(manual)) => Some(Self::Manual {
                        manual: manual.to_string(),
                    }),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Coordinates usable for routing, if any
    ///
    /// `0,0` is the WebApp's "no location" placeholder and yields `None`.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            Self::Point(point) if is_placeholder(point.lat, point.lng) => None,
            Self::Point(point) => Coordinates::checked(point.lat, point.lng),
            Self::Manual { manual } => parse_manual(manual),
        }
    }

    /// Human readable form for admin messages
    pub fn describe(&self) -> String {
        match (self, self.coordinates()) {
            (_, Some(point)) => point.maps_link(),
            (Self::Manual { manual }, None) => manual.clone(),
            (Self::Point(_), None) => "not provided".to_string(),
        }
    }
}

/// Extracts routable coordinates from a stored or submitted location value
pub fn parse_location(value: &Value) -> Option<Coordinates> {
    Location::from_value(value).and_then(|location| location.coordinates())
}

/// Extracts coordinates from free text: a Google Maps URL or a bare `lat,lng` pair
pub fn parse_manual(text: &str) -> Option<Coordinates> {
    let (lat, lng) = if let Some((_, lat, lng)) = regex_captures!(r"@(-?\d+(?:\.\d+)?),\s*(-?\d+(?:\.\d+)?)", text) {
        (lat, lng)
    } else if let Some((_, lat, lng)) = regex_captures!(r"[?&](?:q|query)=(-?\d+(?:\.\d+)?),\s*(-?\d+(?:\.\d+)?)", text) {
        (lat, lng)
    } else if let Some((_, lat, lng)) = regex_captures!(r"^\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*$", text) {
        (lat, lng)
    } else {
        return None;
    };

    Coordinates::checked(lat.parse().ok()?, lng.parse().ok()?)
}

fn is_placeholder(lat: f64, lng: f64) -> bool {
    lat == 0.0 && lng == 0.0
}

fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
