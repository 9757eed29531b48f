use crate::{
    entities::appointment::{
        self, AppointmentStatus, Entity as AppointmentEntity, Model as AppointmentModel,
        REPAIR_STATUSES,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    phone,
    services::storage::ImageStore,
};
use chrono::{NaiveDate, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Request/Response types for the appointment service
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    /// Customer-facing tracking code; generated when absent
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

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub status: Option<String>,
    pub repair_status: Option<String>,
    pub current_repair_part: Option<String>,
    pub costing: Option<serde_json::Value>,
    pub damage_images: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppointmentListResponse {
    pub appointments: Vec<AppointmentModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for managing the active appointment set
#[derive(Clone)]
pub struct AppointmentService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    image_store: Arc<ImageStore>,
}

impl AppointmentService {
    /// Creates a new appointment service instance
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

    /// Books a new appointment from the public form
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<AppointmentModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        if !phone::is_valid_phone_number(&request.phone) {
            return Err(ServiceError::ValidationError(
                "phone: must be a valid mobile or telephone number".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = Utc::now();
        let appointment_id = Uuid::new_v4();
        let tracking_code = request
            .tracking_code
            .filter(|code| !code.trim().is_empty())
            .unwrap_or_else(generate_tracking_code);

        let model = appointment::ActiveModel {
            id: Set(appointment_id),
            tracking_code: Set(tracking_code),
            name: Set(request.name),
            email: Set(request.email),
            phone: Set(phone::format_phone_number(&request.phone)),
            vehicle_make: Set(request.vehicle_make),
            vehicle_model: Set(request.vehicle_model),
            vehicle_year: Set(request.vehicle_year),
            vehicle_plate: Set(request.vehicle_plate),
            service: Set(request.service),
            preferred_date: Set(request.preferred_date),
            message: Set(request.message),
            status: Set(AppointmentStatus::Pending.as_str().to_string()),
            repair_status: Set(None),
            current_repair_part: Set(None),
            costing: Set(None),
            estimate_number: Set(None),
            damage_images: Set(serde_json::json!(request.damage_images)),
            orcr_images: Set(serde_json::json!(request.orcr_images)),
            status_updated_at: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let appointment = model.insert(db).await.map_err(|e| {
            error!(error = %e, appointment_id = %appointment_id, "Failed to create appointment");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            appointment_id = %appointment_id,
            tracking_code = %appointment.tracking_code,
            "Appointment booked"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::AppointmentBooked(appointment_id))
            .await
        {
            warn!(error = %e, appointment_id = %appointment_id, "Failed to send booking event");
        }

        Ok(appointment)
    }

    /// Retrieves an appointment by ID
    #[instrument(skip(self), fields(appointment_id = %appointment_id))]
    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<AppointmentModel>, ServiceError> {
        let db = &*self.db_pool;

        AppointmentEntity::find_by_id(appointment_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Looks up an appointment through its customer-facing tracking code
    #[instrument(skip(self))]
    pub async fn get_by_tracking_code(
        &self,
        tracking_code: &str,
    ) -> Result<AppointmentModel, ServiceError> {
        let db = &*self.db_pool;

        AppointmentEntity::find()
            .filter(appointment::Column::TrackingCode.eq(tracking_code))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound("Appointment not found".to_string()))
    }

    /// Lists active appointments, newest first
    #[instrument(skip(self))]
    pub async fn list_appointments(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<AppointmentListResponse, ServiceError> {
        let db = &*self.db_pool;

        let paginator = AppointmentEntity::find()
            .order_by_desc(appointment::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count appointments");
            ServiceError::DatabaseError(e)
        })?;

        let appointments = paginator.fetch_page(page.saturating_sub(1)).await.map_err(|e| {
            error!(error = %e, page = page, "Failed to fetch appointments page");
            ServiceError::DatabaseError(e)
        })?;

        Ok(AppointmentListResponse {
            appointments,
            total,
            page,
            per_page,
        })
    }

    /// Applies admin field updates to an appointment
    #[instrument(skip(self, request), fields(appointment_id = %appointment_id))]
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<AppointmentModel, ServiceError> {
        if let Some(status) = request.status.as_deref() {
            if AppointmentStatus::from_str(status).is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "Unknown appointment status: {status}"
                )));
            }
        }
        if let Some(repair_status) = request.repair_status.as_deref() {
            if !REPAIR_STATUSES.contains(&repair_status) {
                return Err(ServiceError::ValidationError(format!(
                    "Unknown repair status: {repair_status}"
                )));
            }
        }

        let db = &*self.db_pool;
        let now = Utc::now();

        let appointment = AppointmentEntity::find_by_id(appointment_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound("Appointment not found".to_string()))?;

        let old_status = appointment.status.clone();
        let status_changed = request
            .status
            .as_deref()
            .map(|s| s != old_status)
            .unwrap_or(false);

        let mut active: appointment::ActiveModel = appointment.into();

        if let Some(status) = request.status.clone() {
            active.status = Set(status);
            active.status_updated_at = Set(Some(now));
        }
        if let Some(repair_status) = request.repair_status {
            active.repair_status = Set(Some(repair_status));
            active.status_updated_at = Set(Some(now));
        }
        if let Some(part) = request.current_repair_part {
            active.current_repair_part = Set(Some(part));
        }
        if let Some(costing) = request.costing {
            active.costing = Set(Some(costing));
        }
        if let Some(images) = request.damage_images {
            active.damage_images = Set(serde_json::json!(images));
        }
        active.updated_at = Set(Some(now));

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, appointment_id = %appointment_id, "Failed to update appointment");
            ServiceError::DatabaseError(e)
        })?;

        if status_changed {
            if let Err(e) = self
                .event_sender
                .send(Event::AppointmentStatusChanged {
                    appointment_id,
                    old_status,
                    new_status: updated.status.clone(),
                })
                .await
            {
                warn!(error = %e, appointment_id = %appointment_id, "Failed to send status event");
            }
        } else if let Err(e) = self
            .event_sender
            .send(Event::AppointmentUpdated(appointment_id))
            .await
        {
            warn!(error = %e, appointment_id = %appointment_id, "Failed to send update event");
        }

        Ok(updated)
    }

    /// Deletes an active appointment outright (no history record).
    ///
    /// Image cleanup is best-effort; the row disappears regardless.
    #[instrument(skip(self), fields(appointment_id = %appointment_id))]
    pub async fn delete_appointment(&self, appointment_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let appointment = AppointmentEntity::find_by_id(appointment_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound("Appointment not found".to_string()))?;

        self.image_store
            .remove_urls_best_effort(&appointment.damage_image_urls())
            .await;

        AppointmentEntity::delete_by_id(appointment_id)
            .exec(db)
            .await
            .map_err(|e| {
                error!(error = %e, appointment_id = %appointment_id, "Failed to delete appointment");
                ServiceError::DatabaseError(e)
            })?;

        info!(appointment_id = %appointment_id, "Appointment deleted");

        if let Err(e) = self
            .event_sender
            .send(Event::AppointmentDeleted(appointment_id))
            .await
        {
            warn!(error = %e, appointment_id = %appointment_id, "Failed to send delete event");
        }

        Ok(())
    }
}

/// Generates a customer-facing tracking code: base-36 timestamp plus a
/// random suffix, uppercased, e.g. `LZT3K9-7Q2M4X`.
pub fn generate_tracking_code() -> String {
    let millis = Utc::now().timestamp_millis().unsigned_abs();
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();

    format!(
        "{}-{}",
        to_base36(millis).to_uppercase(),
        suffix.to_uppercase()
    )
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base36_round_trip_against_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(46655), "zzz");
    }

    #[test]
    fn tracking_codes_have_the_expected_shape() {
        let code = generate_tracking_code();
        let (stamp, suffix) = code.split_once('-').expect("code has a dash");
        assert!(!stamp.is_empty());
        assert_eq!(suffix.len(), 6);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn tracking_codes_do_not_trivially_collide() {
        let codes: std::collections::HashSet<String> =
            (0..64).map(|_| generate_tracking_code()).collect();
        assert_eq!(codes.len(), 64);
    }
}
