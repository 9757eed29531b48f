use crate::{
    entities::feedback::{self, Entity as FeedbackEntity, Model as FeedbackModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateFeedbackRequest {
    pub appointment_id: Uuid,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,

    pub comment: Option<String>,
    pub customer_name: Option<String>,

    #[validate(length(min = 1, message = "Service is required"))]
    pub service: String,
}

#[derive(Debug, Default)]
pub struct FeedbackFilter {
    pub service: Option<String>,
    pub appointment_id: Option<Uuid>,
}

/// Service for customer feedback, one entry per appointment
#[derive(Clone)]
pub struct FeedbackService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl FeedbackService {
    /// Creates a new feedback service instance
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Submits feedback for an appointment.
    ///
    /// The existence check gives a friendly error for the common double
    /// submit; the unique index on `appointment_id` closes the race two
    /// simultaneous submissions would otherwise slip through.
    #[instrument(skip(self, request), fields(appointment_id = %request.appointment_id))]
    pub async fn submit(
        &self,
        request: CreateFeedbackRequest,
    ) -> Result<FeedbackModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;

        let existing = FeedbackEntity::find()
            .filter(feedback::Column::AppointmentId.eq(request.appointment_id))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if existing.is_some() {
            return Err(ServiceError::ValidationError(
                "Feedback already submitted for this appointment".to_string(),
            ));
        }

        let model = feedback::ActiveModel {
            id: Set(Uuid::new_v4()),
            appointment_id: Set(request.appointment_id),
            rating: Set(request.rating),
            comment: Set(request.comment),
            customer_name: Set(request.customer_name),
            service: Set(request.service),
            created_at: Set(Utc::now()),
        };

        let record = model.insert(db).await.map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::ValidationError(
                    "Feedback already submitted for this appointment".to_string(),
                )
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;

        info!(feedback_id = %record.id, rating = record.rating, "Feedback submitted");

        if let Err(e) = self
            .event_sender
            .send(Event::FeedbackSubmitted(record.id))
            .await
        {
            warn!(error = %e, feedback_id = %record.id, "Failed to send feedback event");
        }

        Ok(record)
    }

    /// Lists feedback, newest first, optionally filtered by service or
    /// appointment
    #[instrument(skip(self))]
    pub async fn list(&self, filter: FeedbackFilter) -> Result<Vec<FeedbackModel>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = FeedbackEntity::find().order_by_desc(feedback::Column::CreatedAt);

        if let Some(service) = filter.service {
            query = query.filter(feedback::Column::Service.eq(service));
        }
        if let Some(appointment_id) = filter.appointment_id {
            query = query.filter(feedback::Column::AppointmentId.eq(appointment_id));
        }

        query.all(db).await.map_err(ServiceError::DatabaseError)
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
