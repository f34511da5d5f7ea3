use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::core::error::{AppError, AppResult};

/// Reads an ETA given by the dashboard as whole minutes
///
/// Accepted: a number, a numeric string with an optional `min`/`mins`/`minutes`
/// suffix, or an RFC 3339 timestamp (turned into minutes from `now`, rounded
/// up, never negative). `null` and empty strings clear the ETA.
pub fn parse_eta_input(value: &Value, now: DateTime<Utc>) -> AppResult<Option<u32>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .and_then(minutes_from_number)
            .map(Some)
            .ok_or_else(|| invalid(value)),
        Value::String(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(None);
            }
            if let Some(minutes) = numeric_minutes(raw) {
                return Ok(Some(minutes));
            }
            let at = DateTime::parse_from_rfc3339(raw).map_err(|_| invalid(value))?;
            let seconds = (at.with_timezone(&Utc) - now).num_seconds().max(0);
            Ok(Some(u32::try_from((seconds + 59) / 60).unwrap_or(u32::MAX)))
        }
        _ => Err(invalid(value)),
    }
}

fn numeric_minutes(raw: &str) -> Option<u32> {
    let (_, number) = lazy_regex::regex_captures!(r"(?i)^(\d+(?:\.\d+)?)\s*(?:m|min|mins|minutes?)?$", raw)?;
    number.parse::<f64>().ok().and_then(minutes_from_number)
}

fn minutes_from_number(n: f64) -> Option<u32> {
    if n.is_finite() && n >= 0.0 && n <= f64::from(u32::MAX) {
        Some(n.round() as u32)
    } else {
        None
    }
}

fn invalid(value: &Value) -> AppError {
    AppError::Validation(format!("invalid ETA value: {}", value))
}
