use axum::{
    extract::{Multipart, State},
    response::Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Public URLs of the stored images, in upload order
    pub urls: Vec<String>,
}

/// Upload damage or ORCR images for a booking (public).
///
/// Multipart form: a `trackingCode` field plus up to the configured number
/// of `files` parts, image MIME types only. Objects are keyed under the
/// tracking code so archival can clean them up as a group.
#[utoipa::path(
    post,
    path = "/api/v1/uploads",
    responses(
        (status = 200, description = "Images stored", body = UploadResponse),
        (status = 400, description = "Missing tracking code, too many files, or non-image upload", body = crate::errors::ErrorResponse),
        (status = 502, description = "Image store unavailable", body = crate::errors::ErrorResponse),
    ),
    tag = "uploads"
)]
pub async fn upload_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, ServiceError> {
    let max_files = state.config.max_upload_files;

    let mut tracking_code: Option<String> = None;
    let mut pending: Vec<(String, String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ServiceError::BadRequest(format!("Malformed multipart request: {}", e))
    })? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("trackingCode") => {
                let value = field.text().await.map_err(|e| {
                    ServiceError::BadRequest(format!("Unreadable trackingCode field: {}", e))
                })?;
                tracking_code = Some(value.trim().to_string());
            }
            Some("files") => {
                if pending.len() >= max_files {
                    return Err(ServiceError::BadRequest(format!(
                        "At most {max_files} files per upload"
                    )));
                }

                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .ok_or_else(|| ServiceError::BadRequest("File is missing a content type".to_string()))?;

                if !content_type.starts_with("image/") {
                    return Err(ServiceError::BadRequest(format!(
                        "Only image uploads are accepted, got {content_type}"
                    )));
                }

                let extension = field
                    .file_name()
                    .and_then(|name| name.rsplit('.').next().map(str::to_string))
                    .filter(|ext| !ext.is_empty() && ext.len() <= 5)
                    .unwrap_or_else(|| "jpg".to_string());

                let bytes = field.bytes().await.map_err(|e| {
                    ServiceError::BadRequest(format!("Unreadable file part: {}", e))
                })?;

                pending.push((extension, content_type, bytes.to_vec()));
            }
            _ => {
                // Unknown fields are ignored so the form can evolve
            }
        }
    }

    let tracking_code = tracking_code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ServiceError::BadRequest("trackingCode is required".to_string()))?;

    if pending.is_empty() {
        return Err(ServiceError::BadRequest("No files provided".to_string()));
    }

    let mut urls = Vec::with_capacity(pending.len());
    for (extension, content_type, bytes) in pending {
        let key = format!("{}/{}.{}", tracking_code, Uuid::new_v4(), extension);
        let url = state
            .services
            .storage
            .upload(&key, &content_type, bytes)
            .await?;
        urls.push(url);
    }

    Ok(Json(ApiResponse::success(UploadResponse { urls })))
}
