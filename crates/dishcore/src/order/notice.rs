//! Texts sent to customers when their order changes

use crate::geo::Coordinates;
use crate::order::OrderStatus;

/// Message for a customer whose order entered `status`
pub fn status_notice(status: OrderStatus, eta_minutes: Option<u32>) -> String {
    match (status, eta_minutes) {
        (OrderStatus::Preparing, _) => "🍳 Your order is being prepared!".to_string(),
        (OrderStatus::Eta, Some(minutes)) => {
            format!("🚗 Your order is on the way! Estimated arrival: {} min.", minutes)
        }
        (OrderStatus::Arriving, _) => "🚗 Your order is on the way!".to_string(),
        (OrderStatus::Arrived, _) => "✅ Your order has arrived!".to_string(),
        (OrderStatus::Cancelled, _) => "❌ Your order has been cancelled.".to_string(),
        (other, _) => format!("Order status updated: {}", other),
    }
}

/// Message for a customer after a dashboard edit
///
/// The ETA and comment lines only appear when the admin supplied them.
pub fn admin_update_notice(status: OrderStatus, eta_minutes: Option<u32>, comment: Option<&str>) -> String {
    let mut text = status_notice(status, None);
    if let Some(minutes) = eta_minutes {
        text.push_str(&format!("\n⏱️ ETA: {} min", minutes));
    }
    if let Some(comment) = comment.map(str::trim).filter(|c| !c.is_empty()) {
        text.push_str(&format!("\nAdmin comment: {}", comment));
    }
    text
}

/// Message for a customer when the driver shares a live location
pub fn driver_location_notice(location: Coordinates, eta_minutes: Option<u32>) -> String {
    let mut text = format!("🚗 Driver shared location: {}", location.maps_link());
    if let Some(minutes) = eta_minutes {
        text.push_str(&format!("\n⏱️ ETA: {} min", minutes));
    }
    text
}
