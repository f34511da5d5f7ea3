use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

/// Where an order is in its delivery lifecycle
///
/// `pending → preparing → eta → arriving → arrived` is the pipeline;
/// `cancelled` sits outside it. Older dashboards and bot revisions used other
/// labels for the same states, [`OrderStatus::parse_label`] maps them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, IntoStaticStr, EnumIter,
)]
#[serde(rename_all = "snake_case", try_from = "String")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Eta,
    Arriving,
    Arrived,
    Cancelled,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown order status '{0}'")]
pub struct UnknownStatus(pub String);

impl OrderStatus {
    /// Parses a canonical or legacy label, ignoring case and surrounding whitespace
    pub fn parse_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace(' ', "-");
        let status = match normalized.as_str() {
            "pending" => Self::Pending,
            "preparing" => Self::Preparing,
            "eta" => Self::Eta,
            "arriving" | "on-the-way" | "on_the_way" | "en-route" | "en_route" | "driver_location"
            | "driver-location" => Self::Arriving,
            "arrived" | "delivered" => Self::Arrived,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => return None,
        };
        Some(status)
    }

    /// Position in the delivery pipeline; `None` for `cancelled`
    pub fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Preparing => Some(1),
            Self::Eta => Some(2),
            Self::Arriving => Some(3),
            Self::Arrived => Some(4),
            Self::Cancelled => None,
        }
    }

    /// No further change is expected from a terminal status
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Arrived | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Whether `self → next` is acceptable under `policy`
    ///
    /// Staying in the same status is always allowed so a double-pressed
    /// button is harmless.
    pub fn can_transition_to(self, next: OrderStatus, policy: TransitionPolicy) -> bool {
        if self == next {
            return true;
        }
        match policy {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Monotonic => {
                if self.is_terminal() {
                    return false;
                }
                match (self.rank(), next.rank()) {
                    (_, None) => true,
                    (Some(current), Some(target)) => target > current,
                    (None, Some(_)) => false,
                }
            }
        }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s).ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Which status changes an admin may make
///
/// `permissive` lets the dashboard set any status at any time (manual
/// correction). `monotonic` only lets orders move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    Monotonic,
}

/// A status change refused by the active [`TransitionPolicy`]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot move order from {from} to {to}")]
    Rejected { from: OrderStatus, to: OrderStatus },
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_canonical_labels_round_trip() {
        for status in OrderStatus::iter() {
            assert_eq!(OrderStatus::parse_label(status.as_str()), Some(status));
            assert_eq!(status.to_string(), status.as_str());
        }
    }

    #[test]
    fn test_legacy_labels_map_to_canonical() {
        assert_eq!(OrderStatus::parse_label("on-the-way"), Some(OrderStatus::Arriving));
        assert_eq!(OrderStatus::parse_label("en-route"), Some(OrderStatus::Arriving));
        assert_eq!(OrderStatus::parse_label("driver_location"), Some(OrderStatus::Arriving));
        assert_eq!(OrderStatus::parse_label("Delivered"), Some(OrderStatus::Arrived));
        assert_eq!(OrderStatus::parse_label(" canceled "), Some(OrderStatus::Cancelled));
        assert_eq!(OrderStatus::parse_label("On the way"), Some(OrderStatus::Arriving));
        assert_eq!(OrderStatus::parse_label("shipped"), None);
    }

    #[test]
    fn test_serde_accepts_legacy_and_writes_canonical() {
        let status: OrderStatus = serde_json::from_str("\"delivered\"").unwrap();
        assert_eq!(status, OrderStatus::Arrived);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"arrived\"");
        assert!(serde_json::from_str::<OrderStatus>("\"lost\"").is_err());
    }

    #[test]
    fn test_permissive_allows_going_back() {
        assert!(OrderStatus::Arrived.can_transition_to(OrderStatus::Pending, TransitionPolicy::Permissive));
        assert!(OrderStatus::Cancelled.can_transition_to(OrderStatus::Preparing, TransitionPolicy::Permissive));
    }

    #[test]
    fn test_monotonic_only_moves_forward() {
        let policy = TransitionPolicy::Monotonic;
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Preparing, policy));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Arrived, policy));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Eta, policy));
        assert!(!OrderStatus::Arriving.can_transition_to(OrderStatus::Preparing, policy));
        assert!(!OrderStatus::Arrived.can_transition_to(OrderStatus::Pending, policy));
    }

    #[test]
    fn test_monotonic_cancel_and_terminal_states() {
        let policy = TransitionPolicy::Monotonic;
        assert!(OrderStatus::Arriving.can_transition_to(OrderStatus::Cancelled, policy));
        assert!(!OrderStatus::Arrived.can_transition_to(OrderStatus::Cancelled, policy));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending, policy));
        // Re-setting the same status is a no-op, even when terminal
        assert!(OrderStatus::Arrived.can_transition_to(OrderStatus::Arrived, policy));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("monotonic".parse::<TransitionPolicy>().unwrap(), TransitionPolicy::Monotonic);
        assert_eq!("PERMISSIVE".parse::<TransitionPolicy>().unwrap(), TransitionPolicy::Permissive);
        assert!("strict".parse::<TransitionPolicy>().is_err());
        assert_eq!(TransitionPolicy::default(), TransitionPolicy::Permissive);
    }
}
