//! Product image uploads to Supabase Storage

use chrono::{DateTime, Utc};
use dishcore::{config, AppError, AppResult};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

const OBJECT_PREFIX: &str = "prod";

pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    service_key: SecretString,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(base_url: String, service_key: SecretString, bucket: String) -> AppResult<Self> {
        let client = Client::builder().timeout(config::network::timeout()).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket,
        })
    }

    /// Stores `bytes` and returns the public URL of the new object
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        let path = object_path(file_name, now);
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path);
        let key = self.service_key.expose_secret();

        log::debug!("Uploading {} bytes to {}/{}", bytes.len(), self.bucket, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .header("apikey", key)
            .header("x-upsert", "false")
            .header(
                reqwest::header::CONTENT_TYPE,
                content_type.unwrap_or("application/octet-stream"),
            )
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(AppError::upstream("Supabase Storage", format!("{}: {}", status, details)));
        }

        let public_url = format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, path);
        log::info!("Uploaded image {}", public_url);
        Ok(public_url)
    }
}

/// `prod/<epoch_ms>-<sanitized name>`
pub fn object_path(file_name: &str, now: DateTime<Utc>) -> String {
    format!("{}/{}-{}", OBJECT_PREFIX, now.timestamp_millis(), sanitize_file_name(file_name))
}

/// Keeps the last path segment and replaces anything outside `[A-Za-z0-9._-]`
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
