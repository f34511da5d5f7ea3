//! Order state machine
//!
//! Every status change in the system goes through [`apply`], whether it comes
//! from a Telegram button, a shared driver location or the admin dashboard.
//! The function is pure: it returns the updated order and leaves persistence
//! and notifications to the caller.

use chrono::{DateTime, Utc};

use crate::geo::Coordinates;
use crate::order::{Order, OrderStatus, TransitionError, TransitionPolicy};

/// Something that happened to an order
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    /// "Set Preparing" button
    Prepare,
    /// "Set Arriving" button
    Dispatch,
    /// "Set Arrived" button
    Deliver,
    Cancel,
    /// "Calculate ETA" button
    EtaCalculated { minutes: u32 },
    /// Driver shared a live location in the admin chat
    DriverLocation { location: Coordinates, eta_minutes: Option<u32> },
    /// Bulk ETA update from the dashboard; status is left alone
    EtaRescheduled { minutes: Option<u32> },
    /// Free-form edit from the dashboard
    AdminEdit(AdminEdit),
}

/// Fields the dashboard may set on an order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminEdit {
    pub status: Option<OrderStatus>,
    pub comment: Option<String>,
    /// `Some(None)` clears the ETA
    pub eta_minutes: Option<Option<u32>>,
    pub driver_location: Option<Coordinates>,
}

/// How an event moves the status
enum Target {
    /// Must be reachable under the policy, otherwise the event is rejected
    Required(OrderStatus),
    /// Taken only when reachable; the rest of the event still applies
    Preferred(OrderStatus),
    Unchanged,
}

impl OrderEvent {
    fn target(&self) -> Target {
        match self {
            Self::Prepare => Target::Required(OrderStatus::Preparing),
            Self::Dispatch => Target::Required(OrderStatus::Arriving),
            Self::Deliver => Target::Required(OrderStatus::Arrived),
            Self::Cancel => Target::Required(OrderStatus::Cancelled),
            Self::EtaCalculated { .. } => Target::Preferred(OrderStatus::Eta),
            Self::DriverLocation { .. } => Target::Preferred(OrderStatus::Arriving),
            Self::EtaRescheduled { .. } => Target::Unchanged,
            Self::AdminEdit(edit) => edit.status.map_or(Target::Unchanged, Target::Required),
        }
    }
}

/// Result of applying an event
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: OrderStatus,
    pub order: Order,
}

impl Transition {
    pub fn to(&self) -> OrderStatus {
        self.order.status
    }

    pub fn status_changed(&self) -> bool {
        self.from != self.order.status
    }
}

/// Applies `event` to `order` under `policy`
///
/// A rejected event leaves nothing changed. `updated_at` is set to `now` on
/// every accepted event.
pub fn apply(
    order: &Order,
    event: &OrderEvent,
    policy: TransitionPolicy,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    let from = order.status;
    let status = match event.target() {
        Target::Required(to) if from.can_transition_to(to, policy) => to,
        Target::Required(to) => return Err(TransitionError::Rejected { from, to }),
        Target::Preferred(to) if from.can_transition_to(to, policy) => to,
        Target::Preferred(_) | Target::Unchanged => from,
    };

    let mut next = order.clone();
    next.status = status;
    next.updated_at = now;

    match event {
        OrderEvent::EtaCalculated { minutes } => next.eta_minutes = Some(*minutes),
        OrderEvent::DriverLocation { location, eta_minutes } => {
            next.driver_location = Some(*location);
            if eta_minutes.is_some() {
                next.eta_minutes = *eta_minutes;
            }
        }
        OrderEvent::EtaRescheduled { minutes } => next.eta_minutes = *minutes,
        OrderEvent::AdminEdit(edit) => {
            if let Some(comment) = &edit.comment {
                next.comment = comment.clone();
            }
            if let Some(minutes) = edit.eta_minutes {
                next.eta_minutes = minutes;
            }
            if edit.driver_location.is_some() {
                next.driver_location = edit.driver_location;
            }
        }
        OrderEvent::Prepare | OrderEvent::Dispatch | OrderEvent::Deliver | OrderEvent::Cancel => {}
    }

    tracing::debug!(
        order_id = %order.order_id,
        from = %from,
        to = %status,
        ?policy,
        "order event applied"
    );

    Ok(Transition { from, order: next })
}
