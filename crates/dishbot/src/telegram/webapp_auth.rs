use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use dishcore::config::webapp::INIT_DATA_MAX_AGE_SECS;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

/// Validates Telegram WebApp init data
///
/// Telegram signs the data with HMAC-SHA256. The key is derived from the bot
/// token: `HMAC_SHA256("WebAppData", bot_token)`.
///
/// # Arguments
/// * `init_data` - Raw `Telegram.WebApp.initData` (query string format)
/// * `bot_token` - Bot token
/// * `now` - Current time, for the 24h freshness check
///
/// # Returns
/// `Ok(user_id)` when the signature holds and the data is fresh
pub fn validate_telegram_webapp_data(init_data: &str, bot_token: &str, now: DateTime<Utc>) -> Result<i64> {
    let params = parse_params(init_data);

    let received_hash = params.get("hash").ok_or_else(|| anyhow!("Missing hash parameter"))?;
    let received_hash = hex::decode(received_hash).map_err(|_| anyhow!("Hash is not hex"))?;

    // All parameters except hash, sorted by key, one per line
    let mut check_pairs: Vec<String> = params
        .iter()
        .filter(|(key, _)| key.as_str() != "hash")
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    check_pairs.sort();
    let data_check_string = check_pairs.join("\n");

    let mut secret_key_mac =
        HmacSha256::new_from_slice(b"WebAppData").map_err(|e| anyhow!("HMAC key error: {}", e))?;
    secret_key_mac.update(bot_token.as_bytes());
    let secret_key = secret_key_mac.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret_key).map_err(|e| anyhow!("HMAC key error: {}", e))?;
    mac.update(data_check_string.as_bytes());
    mac.verify_slice(&received_hash)
        .map_err(|_| anyhow!("Invalid hash - data may be tampered"))?;

    let auth_date: i64 = params
        .get("auth_date")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| anyhow!("Missing auth_date"))?;
    let age_seconds = now.timestamp() - auth_date;
    if age_seconds > INIT_DATA_MAX_AGE_SECS {
        return Err(anyhow!("Init data is too old ({} seconds)", age_seconds));
    }

    user_id_from(&params)
}

fn parse_params(init_data: &str) -> HashMap<String, String> {
    init_data
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let decoded_value = urlencoding::decode(value).ok()?;
            Some((key.to_string(), decoded_value.into_owned()))
        })
        .collect()
}

fn user_id_from(params: &HashMap<String, String>) -> Result<i64> {
    let user_json = params.get("user").ok_or_else(|| anyhow!("Missing user parameter"))?;
    let user: serde_json::Value =
        serde_json::from_str(user_json).map_err(|e| anyhow!("Failed to parse user JSON: {}", e))?;

    user.get("id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| anyhow!("Missing user id in user JSON"))
}
