use axum::{extract::State, response::Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::AdminUser;
use crate::services::reports::MonthlyReport;
use crate::{errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct MonthlyReportRequest {
    /// Calendar month, 1-12
    pub month: u32,
    pub year: i32,
}

/// Generate the AI business report for one month of archived jobs (admin)
#[utoipa::path(
    post,
    path = "/api/v1/reports/monthly",
    request_body = MonthlyReportRequest,
    responses(
        (status = 200, description = "Report generated"),
        (status = 400, description = "Invalid period", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "No archived jobs in the period", body = crate::errors::ErrorResponse),
        (status = 502, description = "No AI provider available", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "reports"
)]
pub async fn monthly_report(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<MonthlyReportRequest>,
) -> Result<Json<ApiResponse<MonthlyReport>>, ServiceError> {
    let report = state
        .services
        .reports
        .monthly_report(body.month, body.year)
        .await?;

    Ok(Json(ApiResponse::success(report)))
}
