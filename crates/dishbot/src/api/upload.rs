use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::api::session::{require_role, Role};
use crate::api::{ApiError, ApiResult};
use crate::state::SharedState;

/// POST /api/upload, multipart field `file`
pub async fn upload_image(
    State(state): State<SharedState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    require_role(&headers, &state, Role::MainAdmin)?;

    let storage = state
        .uploads
        .as_ref()
        .ok_or_else(|| ApiError::Internal("Uploads are not configured (SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY)".to_string()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Error parsing form data: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Error reading file: {}", e)))?;

        let url = storage
            .upload(&file_name, content_type.as_deref(), bytes.to_vec(), Utc::now())
            .await?;
        return Ok(Json(json!({ "url": url })));
    }

    Err(ApiError::BadRequest("No file uploaded".to_string()))
}
