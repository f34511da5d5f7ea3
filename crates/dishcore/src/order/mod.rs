//! Orders: model, status vocabulary and lifecycle

pub mod eta;
pub mod machine;
pub mod model;
pub mod notice;
pub mod status;

pub use eta::parse_eta_input;
pub use machine::{apply, AdminEdit, OrderEvent, Transition};
pub use model::{next_id_instant, order_id_for, parse_meal_text, serialize_money, NewOrder, Order, OrderItem};
pub use status::{OrderStatus, TransitionError, TransitionPolicy, UnknownStatus};
