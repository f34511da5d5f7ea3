use secrecy::SecretString;
use std::str::FromStr;
use std::time::Duration;

use crate::core::error::{AppError, AppResult};
use crate::geo::Coordinates;
use crate::order::TransitionPolicy;

/// Delivery math configuration
pub mod delivery {
    /// Mean Earth radius used by the haversine formula (km)
    pub const EARTH_RADIUS_KM: f64 = 6371.0;

    /// Assumed driver speed for every ETA estimate (km/h)
    pub const AVERAGE_SPEED_KMH: f64 = 40.0;

    /// An ETA is never reported below this many minutes
    pub const MIN_ETA_MINUTES: u32 = 1;

    /// Default driver origin when no live location was shared (Belgrade)
    pub const DEFAULT_DEPOT_LAT: f64 = 44.7866;
    pub const DEFAULT_DEPOT_LNG: f64 = 20.4489;
}

/// Listing limits for the HTTP API
pub mod limits {
    /// Orders returned to a customer by `GET /api/orders`
    pub const CUSTOMER_ORDERS: i64 = 20;

    /// Orders returned to the admin dashboard
    pub const ADMIN_ORDERS: i64 = 50;

    /// Admin chat messages returned by `GET /api/admin-messages`
    pub const ADMIN_MESSAGES: i64 = 50;

    /// Rows returned by the product statistics query
    pub const PRODUCT_STATS: i64 = 100;

    /// Google Directions accepts at most this many waypoints per request
    pub const MAX_DIRECTIONS_WAYPOINTS: usize = 25;

    /// Line items accepted in one order
    pub const MAX_ORDER_ITEMS: usize = 100;

    /// Units of one line item; also keeps `qty` inside a Postgres `int`
    pub const MAX_ITEM_QTY: u32 = 1_000;

    /// Unit price ceiling, in whole currency units
    pub const MAX_ITEM_PRICE: i64 = 10_000;
}

/// Telegram Payments configuration
pub mod payments {
    /// ISO 4217 currency used when PAYMENT_CURRENCY is not set
    pub const DEFAULT_CURRENCY: &str = "EUR";

    /// Invoice title shown by Telegram (1-32 characters)
    pub const INVOICE_TITLE: &str = "dishdash order";

    /// Telegram caps invoice descriptions at 255 characters
    pub const MAX_DESCRIPTION_CHARS: usize = 255;
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for outbound HTTP requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Admin session configuration
pub mod session {
    /// Lifetime of an admin bearer token unless SESSION_TTL_HOURS says otherwise
    pub const DEFAULT_TTL_HOURS: u32 = 12;
}

/// Telegram WebApp configuration
pub mod webapp {
    /// Init data older than this is refused (24 hours)
    pub const INIT_DATA_MAX_AGE_SECS: i64 = 86_400;
}

/// Runtime settings, read once at startup
///
/// Every value comes from the process environment (a `.env` file is loaded
/// by the binary before this runs). Secrets stay wrapped in [`SecretString`]
/// so they never end up in a `Debug` dump or a log line.
#[derive(Debug)]
pub struct Settings {
    /// Bot token (TELEGRAM_BOT_TOKEN)
    pub telegram_bot_token: SecretString,
    /// Bot API base URL override (TELEGRAM_API_URL), e.g. a local Bot API server
    pub telegram_api_url: Option<String>,
    /// Chat that receives new orders and driver buttons (ADMIN_CHAT_ID)
    pub admin_chat_id: i64,
    /// Telegram user that is always authorized on the webhook (OWNER_ID)
    pub owner_id: Option<i64>,
    /// Password exchanged for an `admin` session (ADMIN_PASSWORD)
    pub admin_password: SecretString,
    /// Password exchanged for a `main_admin` session (MAIN_ADMIN_PASSWORD)
    pub main_admin_password: SecretString,
    /// Session signing key (SESSION_SECRET, falls back to the bot token)
    pub session_secret: SecretString,
    /// Session lifetime in hours (SESSION_TTL_HOURS)
    pub session_ttl_hours: u32,
    /// Postgres connection string (DATABASE_URL)
    pub database_url: SecretString,
    /// Google Directions key (GOOGLE_MAPS_API_KEY); greedy routing only when absent
    pub google_maps_api_key: Option<SecretString>,
    /// Supabase project URL (SUPABASE_URL)
    pub supabase_url: Option<String>,
    /// Supabase service role key (SUPABASE_SERVICE_ROLE_KEY)
    pub supabase_service_role_key: Option<SecretString>,
    /// Storage bucket for product images (STORAGE_BUCKET)
    pub storage_bucket: String,
    /// HTTP listen port (WEB_PORT)
    pub web_port: u16,
    /// Pre-built front end served at `/` (STATIC_DIR)
    pub static_dir: Option<String>,
    /// WebApp URL offered by `/start` (WEBAPP_URL)
    pub webapp_url: Option<String>,
    /// Refuse customer requests without Telegram init data (WEBAPP_AUTH_REQUIRED)
    pub webapp_auth_required: bool,
    /// Which status changes are allowed (STATUS_POLICY)
    pub status_policy: TransitionPolicy,
    /// Driver origin for ETA when no live location is known (DEPOT_LAT / DEPOT_LNG)
    pub depot: Coordinates,
    /// Payments provider token for order invoices (TELEGRAM_PROVIDER_TOKEN)
    pub telegram_provider_token: Option<SecretString>,
    /// Invoice currency (PAYMENT_CURRENCY)
    pub payment_currency: String,
    /// Log file path (LOG_FILE_PATH)
    pub log_file_path: String,
}

impl Settings {
    /// Reads settings from the process environment
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary key lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| get(key).ok_or_else(|| AppError::Config(format!("{} is not set", key)));

        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let session_secret = get("SESSION_SECRET").unwrap_or_else(|| telegram_bot_token.clone());

        Ok(Self {
            telegram_bot_token: SecretString::from(telegram_bot_token),
            telegram_api_url: get("TELEGRAM_API_URL"),
            admin_chat_id: parse_value("ADMIN_CHAT_ID", &required("ADMIN_CHAT_ID")?)?,
            owner_id: get("OWNER_ID").map(|v| parse_value("OWNER_ID", &v)).transpose()?,
            admin_password: SecretString::from(required("ADMIN_PASSWORD")?),
            main_admin_password: SecretString::from(required("MAIN_ADMIN_PASSWORD")?),
            session_secret: SecretString::from(session_secret),
            session_ttl_hours: parse_or("SESSION_TTL_HOURS", get("SESSION_TTL_HOURS"), session::DEFAULT_TTL_HOURS)?,
            database_url: SecretString::from(required("DATABASE_URL")?),
            google_maps_api_key: get("GOOGLE_MAPS_API_KEY").map(SecretString::from),
            supabase_url: get("SUPABASE_URL").map(|url| url.trim_end_matches('/').to_string()),
            supabase_service_role_key: get("SUPABASE_SERVICE_ROLE_KEY").map(SecretString::from),
            storage_bucket: get("STORAGE_BUCKET").unwrap_or_else(|| "prod".to_string()),
            web_port: parse_or("WEB_PORT", get("WEB_PORT"), 3000)?,
            static_dir: get("STATIC_DIR"),
            webapp_url: get("WEBAPP_URL"),
            webapp_auth_required: parse_or("WEBAPP_AUTH_REQUIRED", get("WEBAPP_AUTH_REQUIRED"), false)?,
            status_policy: parse_or("STATUS_POLICY", get("STATUS_POLICY"), TransitionPolicy::default())?,
            depot: Coordinates::new(
                parse_or("DEPOT_LAT", get("DEPOT_LAT"), delivery::DEFAULT_DEPOT_LAT)?,
                parse_or("DEPOT_LNG", get("DEPOT_LNG"), delivery::DEFAULT_DEPOT_LNG)?,
            ),
            telegram_provider_token: get("TELEGRAM_PROVIDER_TOKEN").map(SecretString::from),
            payment_currency: get("PAYMENT_CURRENCY")
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or_else(|| payments::DEFAULT_CURRENCY.to_string()),
            log_file_path: get("LOG_FILE_PATH").unwrap_or_else(|| "dishdash.log".to_string()),
        })
    }

    /// Session lifetime as a duration
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.session_ttl_hours) * 3600)
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> AppResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| AppError::Config(format!("{} has invalid value '{}': {}", key, raw, e)))
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> AppResult<T>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("TELEGRAM_BOT_TOKEN", "123:ABC"),
            ("ADMIN_CHAT_ID", "-100200300"),
            ("ADMIN_PASSWORD", "admin-pass"),
            ("MAIN_ADMIN_PASSWORD", "main-pass"),
            ("DATABASE_URL", "postgres://localhost/dishdash"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> AppResult<Settings> {
        Settings::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults_applied() {
        let settings = load(&base_env()).unwrap();
        assert_eq!(settings.admin_chat_id, -100200300);
        assert_eq!(settings.web_port, 3000);
        assert_eq!(settings.storage_bucket, "prod");
        assert_eq!(settings.status_policy, TransitionPolicy::Permissive);
        assert_eq!(settings.session_ttl_hours, 12);
        assert!(settings.owner_id.is_none());
        assert!(!settings.webapp_auth_required);
        assert!(settings.telegram_provider_token.is_none());
        assert_eq!(settings.payment_currency, "EUR");
        assert_eq!(settings.depot, Coordinates::new(44.7866, 20.4489));
        // Session secret falls back to the bot token
        assert_eq!(settings.session_secret.expose_secret(), "123:ABC");
    }

    #[test]
    fn test_missing_required_key() {
        let mut env = base_env();
        env.remove("ADMIN_PASSWORD");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("ADMIN_PASSWORD"));
    }

    #[test]
    fn test_empty_value_counts_as_unset() {
        let mut env = base_env();
        env.insert("DATABASE_URL", "   ");
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_overrides_parsed() {
        let mut env = base_env();
        env.insert("STATUS_POLICY", "monotonic");
        env.insert("OWNER_ID", "406266417");
        env.insert("WEB_PORT", "8080");
        env.insert("WEBAPP_AUTH_REQUIRED", "true");
        env.insert("SUPABASE_URL", "https://xyz.supabase.co/");
        env.insert("TELEGRAM_PROVIDER_TOKEN", "provider:TEST");
        env.insert("PAYMENT_CURRENCY", "rsd");
        let settings = load(&env).unwrap();
        assert_eq!(settings.telegram_provider_token.unwrap().expose_secret(), "provider:TEST");
        assert_eq!(settings.payment_currency, "RSD");
        assert_eq!(settings.status_policy, TransitionPolicy::Monotonic);
        assert_eq!(settings.owner_id, Some(406266417));
        assert_eq!(settings.web_port, 8080);
        assert!(settings.webapp_auth_required);
        assert_eq!(settings.supabase_url.as_deref(), Some("https://xyz.supabase.co"));
    }

    #[test]
    fn test_invalid_number_reported() {
        let mut env = base_env();
        env.insert("WEB_PORT", "eighty");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("WEB_PORT"));
    }
}
