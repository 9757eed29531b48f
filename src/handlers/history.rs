use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::entities::appointment_history::Model as HistoryModel;
use crate::handlers::common::PaginationParams;
use crate::{errors::ServiceError, ApiResponse, AppState, PaginatedResponse};

/// Archival request: move an active appointment into history.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRequest {
    pub appointment_id: Uuid,
    pub reason: Option<String>,
}

/// List archived appointments, most recent first (admin)
pub async fn list_history(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<HistoryModel>>>, ServiceError> {
    let (page, per_page) = pagination.normalized();
    let result = state.services.history.list(page, per_page).await?;

    let total_pages = result.total.div_ceil(per_page);
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: result.records,
        total: result.total,
        page: result.page,
        limit: result.per_page,
        total_pages,
    })))
}

/// Archive an appointment: copy it into history, clean up its images, and
/// remove it from the active set (admin)
#[utoipa::path(
    post,
    path = "/api/v1/history",
    request_body = ArchiveRequest,
    responses(
        (status = 200, description = "Appointment archived"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Appointment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Record now exists in both active and history sets", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "history"
)]
pub async fn archive_appointment(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<ArchiveRequest>,
) -> Result<Json<ApiResponse<HistoryModel>>, ServiceError> {
    let record = state
        .services
        .history
        .archive(body.appointment_id, body.reason)
        .await?;

    Ok(Json(ApiResponse::success(record)))
}

/// Permanently delete a history record (admin). Irreversible and never
/// touches the active set.
pub async fn delete_history_record(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    state.services.history.delete(id).await?;

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted_id": id }),
    )))
}
