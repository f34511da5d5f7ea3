//! In-memory store double
//!
//! Mirrors the Postgres store's filtering and ordering closely enough for
//! handler tests; nothing here is persisted.

#![allow(dead_code)]

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dishcore::catalog::{AdminMessage, AdminUser, DriverStat, NewAdminMessage, Product, ProductDraft, ProductStat, StatsPeriod};
use dishcore::storage::{AdminStore, OrderStore, ProductStore};
use dishcore::{AppResult, Order, OrderStatus};
use rust_decimal::Decimal;

#[derive(Default)]
struct Inner {
    orders: Vec<Order>,
    notes: HashMap<i64, String>,
    admins: Vec<AdminUser>,
    stats: Vec<DriverStat>,
    messages: Vec<AdminMessage>,
    products: Vec<Product>,
    next_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut inner)
    }

    /// Inserts or replaces an order as-is
    pub fn put_order(&self, order: Order) {
        self.with(|inner| {
            inner.orders.retain(|o| o.order_id != order.order_id);
            inner.orders.push(order);
        });
    }

    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.with(|inner| inner.orders.iter().find(|o| o.order_id == order_id).cloned())
    }

    pub fn all_orders(&self) -> Vec<Order> {
        self.with(|inner| inner.orders.clone())
    }

    pub fn add_admin(&self, user_id: i64) {
        self.with(|inner| {
            inner.admins.push(AdminUser {
                user_id,
                nickname: None,
                created_at: Utc::now(),
            })
        });
    }

    pub fn note(&self, user_id: i64) -> Option<String> {
        self.with(|inner| inner.notes.get(&user_id).cloned())
    }

    pub fn driver_stats_snapshot(&self) -> Vec<DriverStat> {
        self.with(|inner| inner.stats.clone())
    }

    fn next_id(inner: &mut Inner) -> i64 {
        inner.next_id += 1;
        inner.next_id
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> AppResult<bool> {
        Ok(self.with(|inner| {
            if inner.orders.iter().any(|o| o.order_id == order.order_id) {
                return false;
            }
            inner.orders.push(order.clone());
            true
        }))
    }

    async fn get_order(&self, order_id: &str) -> AppResult<Option<Order>> {
        Ok(self.order(order_id))
    }

    async fn save_order(&self, order: &Order) -> AppResult<()> {
        self.with(|inner| {
            if let Some(slot) = inner.orders.iter_mut().find(|o| o.order_id == order.order_id) {
                *slot = order.clone();
            }
        });
        Ok(())
    }

    async fn orders_for_user(&self, user_id: i64, limit: i64) -> AppResult<Vec<Order>> {
        let mut orders = self.with(|inner| {
            inner
                .orders
                .iter()
                .filter(|o| o.user_id == user_id && !o.deleted)
                .cloned()
                .collect::<Vec<_>>()
        });
        newest_first(&mut orders);
        orders.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(orders)
    }

    async fn recent_orders(&self, limit: i64) -> AppResult<Vec<Order>> {
        let mut orders = self.with(|inner| inner.orders.iter().filter(|o| !o.deleted).cloned().collect::<Vec<_>>());
        newest_first(&mut orders);
        orders.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(orders)
    }

    async fn orders_by_ids(&self, order_ids: &[String]) -> AppResult<Vec<Order>> {
        Ok(self.with(|inner| {
            inner
                .orders
                .iter()
                .filter(|o| order_ids.contains(&o.order_id))
                .cloned()
                .collect()
        }))
    }

    async fn latest_open_order(&self) -> AppResult<Option<Order>> {
        let mut open = self.with(|inner| {
            inner
                .orders
                .iter()
                .filter(|o| !o.deleted && matches!(o.status, OrderStatus::Pending | OrderStatus::Eta))
                .cloned()
                .collect::<Vec<_>>()
        });
        newest_first(&mut open);
        Ok(open.into_iter().next())
    }

    async fn soft_delete_order(&self, order_id: &str, user_id: i64) -> AppResult<bool> {
        Ok(self.with(|inner| {
            match inner
                .orders
                .iter_mut()
                .find(|o| o.order_id == order_id && o.user_id == user_id && !o.deleted)
            {
                Some(order) => {
                    order.deleted = true;
                    order.updated_at = Utc::now();
                    true
                }
                None => false,
            }
        }))
    }

    async fn delete_order(&self, order_id: &str) -> AppResult<bool> {
        Ok(self.with(|inner| {
            let before = inner.orders.len();
            inner.orders.retain(|o| o.order_id != order_id);
            inner.orders.len() != before
        }))
    }

    async fn admin_notes(&self, user_ids: &[i64]) -> AppResult<HashMap<i64, String>> {
        Ok(self.with(|inner| {
            inner
                .notes
                .iter()
                .filter(|(id, _)| user_ids.contains(id))
                .map(|(id, note)| (*id, note.clone()))
                .collect()
        }))
    }

    async fn upsert_admin_note(&self, user_id: i64, note: &str) -> AppResult<()> {
        self.with(|inner| inner.notes.insert(user_id, note.to_string()));
        Ok(())
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn is_admin(&self, user_id: i64) -> AppResult<bool> {
        Ok(self.with(|inner| inner.admins.iter().any(|a| a.user_id == user_id)))
    }

    async fn list_admins(&self) -> AppResult<Vec<AdminUser>> {
        Ok(self.with(|inner| inner.admins.iter().rev().cloned().collect()))
    }

    async fn upsert_admin(&self, user_id: i64, nickname: Option<&str>) -> AppResult<()> {
        self.with(|inner| match inner.admins.iter_mut().find(|a| a.user_id == user_id) {
            Some(admin) => admin.nickname = nickname.map(str::to_string),
            None => inner.admins.push(AdminUser {
                user_id,
                nickname: nickname.map(str::to_string),
                created_at: Utc::now(),
            }),
        });
        Ok(())
    }

    async fn remove_admin(&self, user_id: i64) -> AppResult<bool> {
        Ok(self.with(|inner| {
            let before = inner.admins.len();
            inner.admins.retain(|a| a.user_id != user_id);
            inner.admins.len() != before
        }))
    }

    async fn driver_stats(&self) -> AppResult<Vec<DriverStat>> {
        Ok(self.with(|inner| {
            let mut stats = inner.stats.clone();
            for stat in &mut stats {
                stat.nickname = inner
                    .admins
                    .iter()
                    .find(|a| a.user_id == stat.user_id)
                    .and_then(|a| a.nickname.clone());
            }
            stats.sort_by(|a, b| b.date.cmp(&a.date).then(a.user_id.cmp(&b.user_id)));
            stats
        }))
    }

    async fn record_delivery(&self, user_id: i64, date: NaiveDate) -> AppResult<()> {
        self.with(|inner| match inner.stats.iter_mut().find(|s| s.user_id == user_id && s.date == date) {
            Some(stat) => stat.orders_delivered += 1,
            None => inner.stats.push(DriverStat {
                user_id,
                nickname: None,
                date,
                orders_delivered: 1,
                profit: Decimal::ZERO,
                hours_worked: Decimal::ZERO,
                km_driven: Decimal::ZERO,
            }),
        });
        Ok(())
    }

    async fn recent_messages(&self, limit: i64) -> AppResult<Vec<AdminMessage>> {
        Ok(self.with(|inner| {
            let skip = inner.messages.len().saturating_sub(usize::try_from(limit).unwrap_or(0));
            inner.messages.iter().skip(skip).cloned().collect()
        }))
    }

    async fn add_message(&self, message: &NewAdminMessage) -> AppResult<AdminMessage> {
        Ok(self.with(|inner| {
            let saved = AdminMessage {
                id: Self::next_id(inner),
                user_id: message.user_id,
                nickname: message.nickname.clone(),
                message: message.message.clone(),
                created_at: Utc::now(),
            };
            inner.messages.push(saved.clone());
            saved
        }))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_products(&self) -> AppResult<Vec<Product>> {
        Ok(self.with(|inner| inner.products.clone()))
    }

    async fn create_product(&self, draft: &ProductDraft) -> AppResult<Product> {
        Ok(self.with(|inner| {
            let now = Utc::now();
            let product = Product {
                id: Self::next_id(inner),
                name: draft.name.clone(),
                emoji: draft.emoji.clone(),
                price_ranges: draft.price_ranges.clone(),
                image_url: draft.image_url.clone(),
                available: draft.available,
                created_at: now,
                updated_at: now,
            };
            inner.products.push(product.clone());
            product
        }))
    }

    async fn update_product(&self, id: i64, draft: &ProductDraft) -> AppResult<Option<Product>> {
        Ok(self.with(|inner| {
            let product = inner.products.iter_mut().find(|p| p.id == id)?;
            product.name = draft.name.clone();
            product.emoji = draft.emoji.clone();
            product.price_ranges = draft.price_ranges.clone();
            product.image_url = draft.image_url.clone();
            product.available = draft.available;
            product.updated_at = Utc::now();
            Some(product.clone())
        }))
    }

    async fn delete_product(&self, id: i64) -> AppResult<bool> {
        Ok(self.with(|inner| {
            let before = inner.products.len();
            inner.products.retain(|p| p.id != id);
            inner.products.len() != before
        }))
    }

    async fn product_stats(&self, _period: StatsPeriod, limit: i64) -> AppResult<Vec<ProductStat>> {
        Ok(self.with(|inner| {
            let mut stats: Vec<ProductStat> = inner
                .products
                .iter()
                .map(|product| ProductStat {
                    product_id: product.id,
                    name: product.name.clone(),
                    count: inner
                        .orders
                        .iter()
                        .flat_map(|o| &o.items)
                        .filter(|item| item.id == Some(product.id))
                        .map(|item| i64::from(item.qty))
                        .sum(),
                    period: Utc::now(),
                })
                .filter(|stat| stat.count > 0)
                .collect();
            stats.sort_by(|a, b| b.count.cmp(&a.count));
            stats.truncate(usize::try_from(limit).unwrap_or(0));
            stats
        }))
    }
}
