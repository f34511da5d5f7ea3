use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::catalog::{
    AdminMessage, AdminUser, DriverStat, NewAdminMessage, PriceRange, Product, ProductDraft, ProductStat, StatsPeriod,
};
use crate::core::error::{AppError, AppResult};
use crate::geo::{Coordinates, Location};
use crate::order::{Order, OrderItem, OrderStatus};
use crate::storage::{AdminStore, OrderStore, ProductStore};

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

const ORDER_COLUMNS: &str = "order_id, user_id, items, comment, location, status, eta, driver_location, total, \
                             created_at, updated_at, deleted";

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Opens a connection pool
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect(database_url)
            .await?;
        log::info!("Connected to Postgres (pool size {})", MAX_CONNECTIONS);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        log::info!("Database migrations applied");
        Ok(())
    }
}

#[derive(FromRow)]
struct OrderRow {
    order_id: String,
    user_id: i64,
    items: Json<Vec<OrderItem>>,
    comment: String,
    location: Json<Value>,
    status: String,
    eta: Option<i32>,
    driver_location: Option<Json<Coordinates>>,
    total: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted: bool,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::parse_label(&row.status).ok_or(AppError::UnknownStatus(row.status))?;
        let location = Location::from_value(&row.location.0).unwrap_or_else(|| Location::Manual {
            manual: row.location.0.to_string(),
        });

        Ok(Order {
            order_id: row.order_id,
            user_id: row.user_id,
            items: row.items.0,
            comment: row.comment,
            location,
            status,
            eta_minutes: row.eta.and_then(|m| u32::try_from(m).ok()),
            driver_location: row.driver_location.map(|Json(point)| point),
            total: row.total,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted: row.deleted,
        })
    }
}

fn into_orders(rows: Vec<OrderRow>) -> AppResult<Vec<Order>> {
    rows.into_iter().map(Order::try_from).collect()
}

fn eta_column(order: &Order) -> Option<i32> {
    order.eta_minutes.map(|m| i32::try_from(m).unwrap_or(i32::MAX))
}

#[derive(FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    emoji: Option<String>,
    price_ranges: Json<Vec<PriceRange>>,
    image_url: Option<String>,
    available: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            emoji: row.emoji,
            price_ranges: row.price_ranges.0,
            image_url: row.image_url,
            available: row.available,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct AdminUserRow {
    user_id: i64,
    nickname: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct AdminMessageRow {
    id: i64,
    user_id: i64,
    nickname: Option<String>,
    message: String,
    created_at: DateTime<Utc>,
}

impl From<AdminMessageRow> for AdminMessage {
    fn from(row: AdminMessageRow) -> Self {
        AdminMessage {
            id: row.id,
            user_id: row.user_id,
            nickname: row.nickname,
            message: row.message,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct DriverStatRow {
    user_id: i64,
    nickname: Option<String>,
    date: NaiveDate,
    orders_delivered: i32,
    profit: Decimal,
    hours_worked: Decimal,
    km_driven: Decimal,
}

#[derive(FromRow)]
struct ProductStatRow {
    product_id: i64,
    name: String,
    count: i64,
    period: DateTime<Utc>,
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: &Order) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO orders (order_id, user_id, items, comment, location, status, eta, driver_location, total, \
             created_at, updated_at, deleted) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (order_id) DO NOTHING",
        )
        .bind(&order.order_id)
        .bind(order.user_id)
        .bind(Json(&order.items))
        .bind(&order.comment)
        .bind(Json(&order.location))
        .bind(order.status.as_str())
        .bind(eta_column(order))
        .bind(order.driver_location.map(Json))
        .bind(order.total)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.deleted)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_order(&self, order_id: &str) -> AppResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE order_id = $1", ORDER_COLUMNS))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    async fn save_order(&self, order: &Order) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE orders SET items = $2, comment = $3, location = $4, status = $5, eta = $6, \
             driver_location = $7, total = $8, updated_at = $9, deleted = $10 \
             WHERE order_id = $1",
        )
        .bind(&order.order_id)
        .bind(Json(&order.items))
        .bind(&order.comment)
        .bind(Json(&order.location))
        .bind(order.status.as_str())
        .bind(eta_column(order))
        .bind(order.driver_location.map(Json))
        .bind(order.total)
        .bind(order.updated_at)
        .bind(order.deleted)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("order {}", order.order_id)));
        }
        Ok(())
    }

    async fn orders_for_user(&self, user_id: i64, limit: i64) -> AppResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE user_id = $1 AND NOT deleted ORDER BY created_at DESC LIMIT $2",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        into_orders(rows)
    }

    async fn recent_orders(&self, limit: i64) -> AppResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE NOT deleted ORDER BY created_at DESC LIMIT $1",
            ORDER_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        into_orders(rows)
    }

    async fn orders_by_ids(&self, order_ids: &[String]) -> AppResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE order_id = ANY($1)",
            ORDER_COLUMNS
        ))
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;
        into_orders(rows)
    }

    async fn latest_open_order(&self) -> AppResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE NOT deleted AND status IN ('pending', 'eta') \
             ORDER BY created_at DESC LIMIT 1",
            ORDER_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn soft_delete_order(&self, order_id: &str, user_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET deleted = TRUE, updated_at = NOW() \
             WHERE order_id = $1 AND user_id = $2 AND NOT deleted",
        )
        .bind(order_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_order(&self, order_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE order_id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn admin_notes(&self, user_ids: &[i64]) -> AppResult<HashMap<i64, String>> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT user_id, note FROM admin_user_notes WHERE user_id = ANY($1)")
                .bind(user_ids)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    async fn upsert_admin_note(&self, user_id: i64, note: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO admin_user_notes (user_id, note, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (user_id) DO UPDATE SET note = EXCLUDED.note, updated_at = NOW()",
        )
        .bind(user_id)
        .bind(note)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AdminStore for PgStore {
    async fn is_admin(&self, user_id: i64) -> AppResult<bool> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT user_id FROM admin_users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn list_admins(&self) -> AppResult<Vec<AdminUser>> {
        let rows = sqlx::query_as::<_, AdminUserRow>(
            "SELECT user_id, nickname, created_at FROM admin_users ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| AdminUser {
                user_id: row.user_id,
                nickname: row.nickname,
                created_at: row.created_at,
            })
            .collect())
    }

    async fn upsert_admin(&self, user_id: i64, nickname: Option<&str>) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO admin_users (user_id, nickname) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET nickname = EXCLUDED.nickname",
        )
        .bind(user_id)
        .bind(nickname)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_admin(&self, user_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM admin_users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn driver_stats(&self) -> AppResult<Vec<DriverStat>> {
        let rows = sqlx::query_as::<_, DriverStatRow>(
            "SELECT s.user_id, u.nickname, s.date, s.orders_delivered, s.profit, s.hours_worked, s.km_driven \
             FROM driver_stats s \
             LEFT JOIN admin_users u ON s.user_id = u.user_id \
             ORDER BY s.date DESC, s.user_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| DriverStat {
                user_id: row.user_id,
                nickname: row.nickname,
                date: row.date,
                orders_delivered: row.orders_delivered,
                profit: row.profit,
                hours_worked: row.hours_worked,
                km_driven: row.km_driven,
            })
            .collect())
    }

    async fn record_delivery(&self, user_id: i64, date: NaiveDate) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO driver_stats (user_id, date, orders_delivered) VALUES ($1, $2, 1) \
             ON CONFLICT (user_id, date) DO UPDATE SET orders_delivered = driver_stats.orders_delivered + 1",
        )
        .bind(user_id)
        .bind(date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_messages(&self, limit: i64) -> AppResult<Vec<AdminMessage>> {
        let rows = sqlx::query_as::<_, AdminMessageRow>(
            "SELECT id, user_id, nickname, message, created_at FROM ( \
                 SELECT id, user_id, nickname, message, created_at FROM admin_messages \
                 ORDER BY created_at DESC, id DESC LIMIT $1 \
             ) latest ORDER BY created_at ASC, id ASC",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AdminMessage::from).collect())
    }

    async fn add_message(&self, message: &NewAdminMessage) -> AppResult<AdminMessage> {
        let row = sqlx::query_as::<_, AdminMessageRow>(
            "INSERT INTO admin_messages (user_id, nickname, message) VALUES ($1, $2, $3) \
             RETURNING id, user_id, nickname, message, created_at",
        )
        .bind(message.user_id)
        .bind(message.nickname.as_deref())
        .bind(&message.message)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, emoji, price_ranges, image_url, available, created_at, updated_at \
             FROM products ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn create_product(&self, draft: &ProductDraft) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            "INSERT INTO products (name, emoji, price_ranges, image_url, available) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, name, emoji, price_ranges, image_url, available, created_at, updated_at",
        )
        .bind(&draft.name)
        .bind(draft.emoji.as_deref())
        .bind(Json(&draft.price_ranges))
        .bind(draft.image_url.as_deref())
        .bind(draft.available)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_product(&self, id: i64, draft: &ProductDraft) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "UPDATE products SET name = $1, emoji = $2, price_ranges = $3, image_url = $4, available = $5, \
             updated_at = NOW() WHERE id = $6 \
             RETURNING id, name, emoji, price_ranges, image_url, available, created_at, updated_at",
        )
        .bind(&draft.name)
        .bind(draft.emoji.as_deref())
        .bind(Json(&draft.price_ranges))
        .bind(draft.image_url.as_deref())
        .bind(draft.available)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    async fn delete_product(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn product_stats(&self, period: StatsPeriod, limit: i64) -> AppResult<Vec<ProductStat>> {
        let rows = sqlx::query_as::<_, ProductStatRow>(
            "SELECT p.id AS product_id, p.name, \
                    SUM(COALESCE((item->>'qty')::int, 1))::bigint AS count, \
                    date_trunc($1, o.created_at) AS period \
             FROM orders o \
             CROSS JOIN LATERAL jsonb_array_elements(o.items) AS item \
             JOIN products p ON p.id = CASE WHEN item->>'id' ~ '^[0-9]+$' THEN (item->>'id')::bigint END \
             GROUP BY p.id, p.name, period \
             ORDER BY period DESC, count DESC \
             LIMIT $2",
        )
        .bind(period.as_ref())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| ProductStat {
                product_id: row.product_id,
                name: row.name,
                count: row.count,
                period: row.period,
            })
            .collect())
    }
}
