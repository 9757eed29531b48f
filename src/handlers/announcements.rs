use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::entities::announcement::Model as AnnouncementModel;
use crate::{errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostAnnouncementBody {
    pub content: String,
    pub author_name: Option<String>,
}

/// The most recent active announcements (admin)
pub async fn list_announcements(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<Vec<AnnouncementModel>>>, ServiceError> {
    let announcements = state.services.announcements.list_active().await?;
    Ok(Json(ApiResponse::success(announcements)))
}

/// Post a new announcement (admin)
pub async fn post_announcement(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<PostAnnouncementBody>,
) -> Result<(StatusCode, Json<ApiResponse<AnnouncementModel>>), ServiceError> {
    let record = state
        .services
        .announcements
        .post(&body.content, body.author_name.as_deref(), &admin.email)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

/// Retire an announcement; the record stays for the author trail (admin)
pub async fn retire_announcement(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    state.services.announcements.retire(id).await?;

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "retired_id": id }),
    )))
}
