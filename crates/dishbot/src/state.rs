use std::sync::Arc;

use dishcore::maps::DirectionsClient;
use dishcore::{AppResult, Settings, Store};
use secrecy::{ExposeSecret, SecretString};

use crate::api::session::SessionKeys;
use crate::telegram::notifications::Notifier;
use crate::uploads::SupabaseStorage;

/// Everything a request handler needs, shared behind an `Arc`
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn Store>,
    pub notifier: Notifier,
    pub sessions: SessionKeys,
    /// Present when GOOGLE_MAPS_API_KEY is set
    pub directions: Option<DirectionsClient>,
    /// Present when the Supabase URL and key are both set
    pub uploads: Option<SupabaseStorage>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wires the optional integrations from `settings`
    pub fn new(settings: Arc<Settings>, store: Arc<dyn Store>, notifier: Notifier) -> AppResult<Self> {
        let sessions = SessionKeys::new(copy_secret(&settings.session_secret), settings.session_ttl());

        let directions = match &settings.google_maps_api_key {
            Some(key) => Some(DirectionsClient::new(copy_secret(key))?),
            None => None,
        };

        let uploads = match (&settings.supabase_url, &settings.supabase_service_role_key) {
            (Some(url), Some(key)) => Some(SupabaseStorage::new(
                url.clone(),
                copy_secret(key),
                settings.storage_bucket.clone(),
            )?),
            _ => None,
        };

        log::debug!(
            "App state ready (directions: {}, uploads: {})",
            directions.is_some(),
            uploads.is_some()
        );

        Ok(Self {
            settings,
            store,
            notifier,
            sessions,
            directions,
            uploads,
        })
    }
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}
