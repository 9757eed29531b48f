//! Appointment archival: the active-to-history migration.
//!
//! The workflow is strictly ordered so every failure leaves an unambiguous
//! state: the history insert happens first (failure aborts with the active
//! record untouched), image cleanup is best-effort in the middle, and the
//! active-row delete comes last. A delete failure after a successful insert
//! leaves the record in both sets; that duplicate state is surfaced as a
//! conflict so an operator can reconcile it, never swallowed as a generic
//! internal error.

use crate::{
    entities::{
        appointment::{self, AppointmentStatus, Entity as AppointmentEntity},
        appointment_history::{self, Entity as HistoryEntity, Model as HistoryModel},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::storage::ImageStore,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

const DEFAULT_ARCHIVE_REASON: &str = "Archived by admin";

#[derive(Debug)]
pub struct HistoryListResponse {
    pub records: Vec<HistoryModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for the historical record store
#[derive(Clone)]
pub struct HistoryService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    image_store: Arc<ImageStore>,
}

impl HistoryService {
    /// Creates a new history service instance
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        image_store: Arc<ImageStore>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            image_store,
        }
    }

    /// Moves an appointment from the active set into history.
    #[instrument(skip(self, reason), fields(appointment_id = %appointment_id))]
    pub async fn archive(
        &self,
        appointment_id: Uuid,
        reason: Option<String>,
    ) -> Result<HistoryModel, ServiceError> {
        let db = &*self.db_pool;

        let appointment = AppointmentEntity::find_by_id(appointment_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound("Appointment not found".to_string()))?;

        let now = Utc::now();
        let history_id = Uuid::new_v4();
        let completed_at =
            (appointment.status == AppointmentStatus::Completed.as_str()).then_some(now);
        let archived_reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ARCHIVE_REASON.to_string());

        let snapshot = appointment_history::ActiveModel {
            id: Set(history_id),
            original_id: Set(appointment.id),
            tracking_code: Set(appointment.tracking_code.clone()),
            name: Set(appointment.name.clone()),
            email: Set(appointment.email.clone()),
            phone: Set(appointment.phone.clone()),
            vehicle_make: Set(appointment.vehicle_make.clone()),
            vehicle_model: Set(appointment.vehicle_model.clone()),
            vehicle_year: Set(appointment.vehicle_year.clone()),
            vehicle_plate: Set(appointment.vehicle_plate.clone()),
            service: Set(appointment.service.clone()),
            preferred_date: Set(appointment.preferred_date),
            message: Set(appointment.message.clone()),
            final_status: Set(appointment.status.clone()),
            repair_status: Set(appointment.repair_status.clone()),
            current_repair_part: Set(appointment.current_repair_part.clone()),
            costing: Set(appointment.costing.clone()),
            estimate_number: Set(appointment.estimate_number.clone()),
            original_created_at: Set(appointment.created_at),
            completed_at: Set(completed_at),
            archived_reason: Set(archived_reason.clone()),
            archived_at: Set(now),
        };

        // Step 1: insert the snapshot. A failure here aborts the whole
        // archival with the active record and its images untouched.
        let record = snapshot.insert(db).await.map_err(|e| {
            error!(error = %e, appointment_id = %appointment_id, "History insert failed; archival aborted");
            ServiceError::DatabaseError(e)
        })?;

        // Step 2: best-effort image cleanup. The snapshot intentionally does
        // not carry image URLs, so the stored objects have no further use.
        self.image_store
            .remove_urls_best_effort(&appointment.damage_image_urls())
            .await;

        // Step 3: remove the active record. Past this point a failure means
        // the appointment exists in both sets; report that distinctly.
        let deleted = AppointmentEntity::delete_by_id(appointment_id)
            .exec(db)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    appointment_id = %appointment_id,
                    history_id = %history_id,
                    "Active delete failed after history insert; record is duplicated"
                );
                ServiceError::Conflict(format!(
                    "Appointment {appointment_id} was copied to history but could not be removed \
                     from the active set; it now exists in both and needs reconciliation"
                ))
            })?;

        if deleted.rows_affected == 0 {
            // Someone else deleted it between fetch and delete; the archival
            // outcome is still correct, so just note it.
            warn!(appointment_id = %appointment_id, "Active record was already gone at delete time");
        }

        info!(
            appointment_id = %appointment_id,
            history_id = %history_id,
            reason = %archived_reason,
            "Appointment archived"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::AppointmentArchived {
                appointment_id,
                history_id,
                reason: archived_reason,
            })
            .await
        {
            warn!(error = %e, appointment_id = %appointment_id, "Failed to send archive event");
        }

        Ok(record)
    }

    /// Lists history records, most recently archived first
    #[instrument(skip(self))]
    pub async fn list(&self, page: u64, per_page: u64) -> Result<HistoryListResponse, ServiceError> {
        let db = &*self.db_pool;

        let paginator = HistoryEntity::find()
            .order_by_desc(appointment_history::Column::ArchivedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count history records");
            ServiceError::DatabaseError(e)
        })?;

        let records = paginator.fetch_page(page.saturating_sub(1)).await.map_err(|e| {
            error!(error = %e, page = page, "Failed to fetch history page");
            ServiceError::DatabaseError(e)
        })?;

        Ok(HistoryListResponse {
            records,
            total,
            page,
            per_page,
        })
    }

    /// History records archived inside a time window (used for reports)
    #[instrument(skip(self))]
    pub async fn archived_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HistoryModel>, ServiceError> {
        let db = &*self.db_pool;

        HistoryEntity::find()
            .filter(appointment_history::Column::ArchivedAt.gte(start))
            .filter(appointment_history::Column::ArchivedAt.lt(end))
            .order_by_desc(appointment_history::Column::ArchivedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Irreversibly deletes a history record. No active-set interaction.
    #[instrument(skip(self), fields(history_id = %history_id))]
    pub async fn delete(&self, history_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let deleted = HistoryEntity::delete_by_id(history_id)
            .exec(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if deleted.rows_affected == 0 {
            return Err(ServiceError::NotFound("History record not found".to_string()));
        }

        info!(history_id = %history_id, "History record deleted");

        if let Err(e) = self
            .event_sender
            .send(Event::HistoryRecordDeleted(history_id))
            .await
        {
            warn!(error = %e, history_id = %history_id, "Failed to send history delete event");
        }

        Ok(())
    }
}
