use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::entities::appointment::Model as AppointmentModel;
use crate::handlers::common::{validate_input, PaginationParams};
use crate::services::appointments::{CreateAppointmentRequest, UpdateAppointmentRequest};
use crate::{errors::ServiceError, ApiResponse, AppState, PaginatedResponse};

/// Public booking submission. Field names match the booking form's JSON.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    /// Client-generated tracking code; the server generates one when absent
    pub tracking_code: Option<String>,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "A valid email address is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,

    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_year: Option<String>,
    pub vehicle_plate: Option<String>,

    pub service: Option<String>,
    pub preferred_date: Option<NaiveDate>,
    pub message: Option<String>,

    #[serde(default)]
    pub damage_images: Vec<String>,
    #[serde(default)]
    pub orcr_images: Vec<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentBody {
    pub status: Option<String>,
    pub repair_status: Option<String>,
    pub current_repair_part: Option<String>,
    pub costing: Option<serde_json::Value>,
    pub damage_images: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub estimate_number: String,
}

/// Book a new appointment (public)
#[utoipa::path(
    post,
    path = "/api/v1/appointments",
    request_body = BookAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked"),
        (status = 400, description = "Invalid booking data", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "appointments"
)]
pub async fn book_appointment(
    State(state): State<AppState>,
    Json(body): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AppointmentModel>>), ServiceError> {
    validate_input(&body)?;

    let appointment = state
        .services
        .appointments
        .create_appointment(CreateAppointmentRequest {
            tracking_code: body.tracking_code,
            name: body.name,
            email: body.email,
            phone: body.phone,
            vehicle_make: body.vehicle_make,
            vehicle_model: body.vehicle_model,
            vehicle_year: body.vehicle_year,
            vehicle_plate: body.vehicle_plate,
            service: body.service,
            preferred_date: body.preferred_date,
            message: body.message,
            damage_images: body.damage_images,
            orcr_images: body.orcr_images,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(appointment))))
}

/// Look up an appointment by tracking code (public)
#[utoipa::path(
    get,
    path = "/api/v1/appointments/track/{tracking_code}",
    params(("tracking_code" = String, Path, description = "Customer-facing tracking code")),
    responses(
        (status = 200, description = "Appointment returned"),
        (status = 404, description = "No appointment with that tracking code", body = crate::errors::ErrorResponse),
    ),
    tag = "appointments"
)]
pub async fn track_appointment(
    State(state): State<AppState>,
    Path(tracking_code): Path<String>,
) -> Result<Json<ApiResponse<AppointmentModel>>, ServiceError> {
    let appointment = state
        .services
        .appointments
        .get_by_tracking_code(&tracking_code)
        .await?;

    Ok(Json(ApiResponse::success(appointment)))
}

/// List active appointments (admin)
#[utoipa::path(
    get,
    path = "/api/v1/appointments",
    params(PaginationParams),
    responses(
        (status = 200, description = "Appointments returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "appointments"
)]
pub async fn list_appointments(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<AppointmentModel>>>, ServiceError> {
    let (page, per_page) = pagination.normalized();
    let result = state
        .services
        .appointments
        .list_appointments(page, per_page)
        .await?;

    let total_pages = result.total.div_ceil(per_page);
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: result.appointments,
        total: result.total,
        page: result.page,
        limit: result.per_page,
        total_pages,
    })))
}

/// Update appointment status, repair progress, costing, or images (admin)
pub async fn update_appointment(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAppointmentBody>,
) -> Result<Json<ApiResponse<AppointmentModel>>, ServiceError> {
    let updated = state
        .services
        .appointments
        .update_appointment(
            id,
            UpdateAppointmentRequest {
                status: body.status,
                repair_status: body.repair_status,
                current_repair_part: body.current_repair_part,
                costing: body.costing,
                damage_images: body.damage_images,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(updated)))
}

/// Delete an active appointment outright (admin)
pub async fn delete_appointment(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    state.services.appointments.delete_appointment(id).await?;

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted_id": id }),
    )))
}

/// Assign (or return the existing) estimate number for an appointment (admin)
#[utoipa::path(
    post,
    path = "/api/v1/appointments/{id}/estimate",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Estimate number assigned or already present", body = EstimateResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Appointment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Allocation contention exhausted retries", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "appointments"
)]
pub async fn generate_estimate(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<EstimateResponse>>, ServiceError> {
    let estimate_number = state.services.estimates.allocate(id).await?;

    Ok(Json(ApiResponse::success(EstimateResponse {
        estimate_number,
    })))
}
