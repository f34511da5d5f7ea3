//! Persistence interfaces and the Postgres store
//!
//! Handlers only see the traits below. [`PgStore`] is the production
//! implementation; tests plug in an in-memory one.

pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::catalog::{AdminMessage, AdminUser, DriverStat, NewAdminMessage, Product, ProductDraft, ProductStat, StatsPeriod};
use crate::core::error::{AppError, AppResult};
use crate::order::{next_id_instant, order_id_for, NewOrder, Order};

pub use postgres::PgStore;

/// How often a new order id is retried after a collision
const ORDER_ID_ATTEMPTS: usize = 32;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order; `false` when the id is already taken
    async fn insert_order(&self, order: &Order) -> AppResult<bool>;

    /// Looks up an order, soft-deleted ones included
    async fn get_order(&self, order_id: &str) -> AppResult<Option<Order>>;

    /// Writes every mutable field of an existing order
    async fn save_order(&self, order: &Order) -> AppResult<()>;

    /// A customer's visible orders, newest first
    async fn orders_for_user(&self, user_id: i64, limit: i64) -> AppResult<Vec<Order>>;

    /// All visible orders, newest first
    async fn recent_orders(&self, limit: i64) -> AppResult<Vec<Order>>;

    async fn orders_by_ids(&self, order_ids: &[String]) -> AppResult<Vec<Order>>;

    /// Newest visible order that is `pending` or `eta`
    async fn latest_open_order(&self) -> AppResult<Option<Order>>;

    /// Hides an order from its owner; `false` when the user has no such order
    async fn soft_delete_order(&self, order_id: &str, user_id: i64) -> AppResult<bool>;

    /// Removes an order for good
    async fn delete_order(&self, order_id: &str) -> AppResult<bool>;

    /// Admin notes for the given customers
    async fn admin_notes(&self, user_ids: &[i64]) -> AppResult<HashMap<i64, String>>;

    async fn upsert_admin_note(&self, user_id: i64, note: &str) -> AppResult<()>;
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn is_admin(&self, user_id: i64) -> AppResult<bool>;

    /// Newest first
    async fn list_admins(&self) -> AppResult<Vec<AdminUser>>;

    async fn upsert_admin(&self, user_id: i64, nickname: Option<&str>) -> AppResult<()>;

    async fn remove_admin(&self, user_id: i64) -> AppResult<bool>;

    /// Per-day driver totals with nicknames, newest day first
    async fn driver_stats(&self) -> AppResult<Vec<DriverStat>>;

    /// Counts one delivered order for `user_id` on `date`
    async fn record_delivery(&self, user_id: i64, date: NaiveDate) -> AppResult<()>;

    /// Latest admin chat messages, oldest first
    async fn recent_messages(&self, limit: i64) -> AppResult<Vec<AdminMessage>>;

    async fn add_message(&self, message: &NewAdminMessage) -> AppResult<AdminMessage>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Ordered by id
    async fn list_products(&self) -> AppResult<Vec<Product>>;

    async fn create_product(&self, draft: &ProductDraft) -> AppResult<Product>;

    /// `None` when no product has this id
    async fn update_product(&self, id: i64, draft: &ProductDraft) -> AppResult<Option<Product>>;

    async fn delete_product(&self, id: i64) -> AppResult<bool>;

    /// Units ordered per catalog product and period, latest period first
    async fn product_stats(&self, period: StatsPeriod, limit: i64) -> AppResult<Vec<ProductStat>>;
}

/// Everything the service persists
pub trait Store: OrderStore + AdminStore + ProductStore {}

impl<T: OrderStore + AdminStore + ProductStore> Store for T {}

/// Stores a new `pending` order under a fresh `<user_id>_<epoch_ms>` id
///
/// When the id is taken (same user, same millisecond) the millisecond part is
/// bumped until the insert succeeds.
pub async fn place_order<S>(store: &S, new: NewOrder, now: DateTime<Utc>) -> AppResult<Order>
where
    S: OrderStore + ?Sized,
{
    let mut id_instant = now;
    for _ in 0..ORDER_ID_ATTEMPTS {
        let order = Order::pending(order_id_for(new.user_id, id_instant), new.clone(), now);
        if store.insert_order(&order).await? {
            log::info!("Order {} placed by user {}", order.order_id, order.user_id);
            return Ok(order);
        }
        log::debug!("Order id {} taken, retrying", order.order_id);
        id_instant = next_id_instant(id_instant);
    }

    Err(AppError::upstream(
        "Database",
        format!("no free order id for user {} after {} attempts", new.user_id, ORDER_ID_ATTEMPTS),
    ))
}
