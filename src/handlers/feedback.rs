use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::feedback::Model as FeedbackModel;
use crate::handlers::common::validate_input;
use crate::services::feedback::{CreateFeedbackRequest, FeedbackFilter};
use crate::{errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackListQuery {
    pub service: Option<String>,
    pub appointment_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackBody {
    pub appointment_id: Uuid,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,

    pub comment: Option<String>,
    pub customer_name: Option<String>,

    #[validate(length(min = 1, message = "Service is required"))]
    pub service: String,
}

/// List feedback, optionally filtered by service or appointment (public:
/// testimonials render from this)
pub async fn list_feedback(
    State(state): State<AppState>,
    Query(query): Query<FeedbackListQuery>,
) -> Result<Json<ApiResponse<Vec<FeedbackModel>>>, ServiceError> {
    let feedback = state
        .services
        .feedback
        .list(FeedbackFilter {
            service: query.service,
            appointment_id: query.appointment_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(feedback)))
}

/// Submit feedback for an appointment; a second submission for the same
/// appointment is rejected (public)
#[utoipa::path(
    post,
    path = "/api/v1/feedback",
    request_body = SubmitFeedbackBody,
    responses(
        (status = 201, description = "Feedback recorded"),
        (status = 400, description = "Invalid request or feedback already submitted", body = crate::errors::ErrorResponse),
    ),
    tag = "feedback"
)]
pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(body): Json<SubmitFeedbackBody>,
) -> Result<(StatusCode, Json<ApiResponse<FeedbackModel>>), ServiceError> {
    validate_input(&body)?;

    let record = state
        .services
        .feedback
        .submit(CreateFeedbackRequest {
            appointment_id: body.appointment_id,
            rating: body.rating,
            comment: body.comment,
            customer_name: body.customer_name,
            service: body.service,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}
