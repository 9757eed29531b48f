use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::entities::appointment_part::Model as PartModel;
use crate::handlers::common::validate_input;
use crate::services::parts::{CreatePartRequest, UpdatePartRequest};
use crate::{errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct PartListQuery {
    pub appointment_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartBody {
    pub appointment_id: Uuid,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    pub brand: Option<String>,
    pub part_type: Option<String>,
    pub price: Option<Decimal>,

    #[serde(default = "default_quantity")]
    pub quantity: i32,

    pub status: Option<String>,
    pub inventory_id: Option<Uuid>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePartBody {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub part_type: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub status: Option<String>,
}

/// Parts attached to one appointment (public: the tracking page shows them)
pub async fn list_parts(
    State(state): State<AppState>,
    Query(query): Query<PartListQuery>,
) -> Result<Json<ApiResponse<Vec<PartModel>>>, ServiceError> {
    let parts = state
        .services
        .parts
        .list_for_appointment(query.appointment_id)
        .await?;

    Ok(Json(ApiResponse::success(parts)))
}

/// Attach a part to an appointment; warehouse-sourced parts decrement stock
/// atomically (admin)
#[utoipa::path(
    post,
    path = "/api/v1/parts",
    request_body = CreatePartBody,
    responses(
        (status = 201, description = "Part assigned"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Appointment or inventory item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "parts"
)]
pub async fn create_part(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<CreatePartBody>,
) -> Result<(StatusCode, Json<ApiResponse<PartModel>>), ServiceError> {
    validate_input(&body)?;

    let part = state
        .services
        .parts
        .create_part(
            CreatePartRequest {
                appointment_id: body.appointment_id,
                name: body.name,
                brand: body.brand,
                part_type: body.part_type,
                price: body.price,
                quantity: body.quantity,
                status: body.status,
                inventory_id: body.inventory_id,
            },
            &admin.email,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(part))))
}

/// Update a part line item (admin)
pub async fn update_part(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePartBody>,
) -> Result<Json<ApiResponse<PartModel>>, ServiceError> {
    let part = state
        .services
        .parts
        .update_part(
            id,
            UpdatePartRequest {
                name: body.name,
                brand: body.brand,
                part_type: body.part_type,
                price: body.price,
                quantity: body.quantity,
                status: body.status,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(part)))
}

/// Remove a part line item (admin)
pub async fn delete_part(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    state.services.parts.delete_part(id).await?;

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted_id": id }),
    )))
}
