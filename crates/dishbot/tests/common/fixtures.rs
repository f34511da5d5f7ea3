//! Test application wiring and request helpers

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use dishbot::api::router;
use dishbot::api::session::Role;
use dishbot::state::AppState;
use dishbot::telegram::Notifier;
use dishcore::order::{NewOrder, OrderItem};
use dishcore::{Coordinates, Location, Order, OrderStatus, Settings};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::Sha256;
use tower::ServiceExt;

use super::memory_store::MemoryStore;
use super::telegram_mock::{TelegramMock, TEST_BOT_TOKEN};

pub const ADMIN_CHAT_ID: i64 = -100200300;
pub const OWNER_ID: i64 = 406266417;
pub const CUSTOMER_ID: i64 = 111;
pub const ADMIN_PASSWORD: &str = "admin-pass";
pub const MAIN_ADMIN_PASSWORD: &str = "main-pass";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub telegram: TelegramMock,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_env(&[]).await
    }

    /// Test app with extra or overridden environment values
    pub async fn with_env(overrides: &[(&str, &str)]) -> Self {
        let mut env: HashMap<String, String> = [
            ("TELEGRAM_BOT_TOKEN", TEST_BOT_TOKEN),
            ("ADMIN_CHAT_ID", "-100200300"),
            ("OWNER_ID", "406266417"),
            ("ADMIN_PASSWORD", ADMIN_PASSWORD),
            ("MAIN_ADMIN_PASSWORD", MAIN_ADMIN_PASSWORD),
            ("SESSION_SECRET", "test-session-secret"),
            ("DATABASE_URL", "postgres://unused/test"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (key, value) in overrides {
            env.insert(key.to_string(), value.to_string());
        }

        let settings = Arc::new(Settings::from_lookup(|key| env.get(key).cloned()).unwrap());
        let telegram = TelegramMock::start().await;
        let store = Arc::new(MemoryStore::new());
        let notifier = Notifier::new(telegram.bot(), settings.admin_chat_id);
        let state = Arc::new(AppState::new(settings, store.clone(), notifier).unwrap());

        Self {
            router: router(Arc::clone(&state)),
            state,
            store,
            telegram,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>, headers: &[(&str, String)]) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, value);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, &[]).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body), &[]).await
    }

    /// Logs in through the API and returns a bearer header for `role`
    pub async fn auth(&self, role: Role) -> (&'static str, String) {
        let password = match role {
            Role::Admin => ADMIN_PASSWORD,
            Role::MainAdmin => MAIN_ADMIN_PASSWORD,
        };
        let login = self
            .post("/api/admin/login", serde_json::json!({ "password": password }))
            .await;
        assert_eq!(login.status, StatusCode::OK, "login failed: {}", login.body);
        let token = login.body["token"].as_str().unwrap().to_string();
        ("authorization", format!("Bearer {}", token))
    }

    pub async fn as_admin(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let auth = self.auth(Role::Admin).await;
        self.request(method, uri, body, &[auth]).await
    }

    pub async fn as_main_admin(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let auth = self.auth(Role::MainAdmin).await;
        self.request(method, uri, body, &[auth]).await
    }

    /// Sends a Telegram update to the webhook
    pub async fn webhook(&self, update: Value) -> TestResponse {
        self.post("/api/webhook", update).await
    }
}

/// An order in `status` whose id and creation time come from `millis`
pub fn order_fixture(user_id: i64, millis: i64, status: OrderStatus, location: Location) -> Order {
    let created = created_at(millis);
    let mut order = Order::pending(
        format!("{}_{}", user_id, millis),
        NewOrder {
            user_id,
            items: vec![OrderItem::named("Pizza", 2)],
            comment: String::new(),
            location,
            total: Decimal::new(2000, 2),
        },
        created,
    );
    order.status = status;
    order
}

pub fn created_at(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

pub fn minutes_ago(minutes: i64) -> i64 {
    (Utc::now() - Duration::minutes(minutes)).timestamp_millis()
}

pub fn belgrade_customer() -> Location {
    Location::Point(Coordinates::new(44.8176, 20.4569))
}

/// Init data signed the way Telegram signs `WebApp.initData`
pub fn signed_init_data(user_id: i64, auth_date: i64) -> String {
    let user = format!(r#"{{"id":{},"first_name":"Ana"}}"#, user_id);
    let fields = [("auth_date", auth_date.to_string()), ("user", user)];
    let data_check_string = fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n");

    let mut secret_mac = Hmac::<Sha256>::new_from_slice(b"WebAppData").unwrap();
    secret_mac.update(TEST_BOT_TOKEN.as_bytes());
    let secret = secret_mac.finalize().into_bytes();
    let mut mac = Hmac::<Sha256>::new_from_slice(&secret).unwrap();
    mac.update(data_check_string.as_bytes());
    let hash = hex::encode(mac.finalize().into_bytes());

    let mut query = fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>();
    query.push(format!("hash={}", hash));
    query.join("&")
}
