//! Inline button payloads
//!
//! Current buttons send `<action>:<order_id>`. Messages posted by older bot
//! versions still carry `calc_eta_<id>[_lat_lng]`, `arrived_<id>`,
//! `preparing_<id>` or `arriving_<id>`, which are understood as well.

use lazy_regex::regex_captures;
use strum::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum CallbackAction {
    Preparing,
    Eta,
    Arriving,
    Arrived,
}

impl CallbackAction {
    /// Payload for a button acting on `order_id`
    pub fn data(self, order_id: &str) -> String {
        format!("{}:{}", self, order_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCallback {
    pub action: CallbackAction,
    pub order_id: String,
}

/// Reads a button payload, current or legacy
pub fn parse_callback(data: &str) -> Option<OrderCallback> {
    let data = data.trim();

    if let Some((action, order_id)) = data.split_once(':') {
        let action = action.parse().ok()?;
        let (_, order_id) = regex_captures!(r"^(\d+_\d+)$", order_id)?;
        return Some(OrderCallback {
            action,
            order_id: order_id.to_string(),
        });
    }

    let (action, rest) = if let Some(rest) = data.strip_prefix("calc_eta_") {
        (CallbackAction::Eta, rest)
    } else if let Some(rest) = data.strip_prefix("arrived_") {
        (CallbackAction::Arrived, rest)
    } else if let Some(rest) = data.strip_prefix("preparing_") {
        (CallbackAction::Preparing, rest)
    } else if let Some(rest) = data.strip_prefix("arriving_") {
        (CallbackAction::Arriving, rest)
    } else {
        return None;
    };

    let (_, order_id) = regex_captures!(r"^(\d+_\d+)(?:_|$)", rest)?;
    Some(OrderCallback {
        action,
        order_id: order_id.to_string(),
    })
}
