use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an active appointment.
///
/// `Completed` is the terminal state; archival stamps `completed_at` on the
/// history record only for appointments archived in this state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Pending,
    Contacted,
    Confirmed,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Contacted => "contacted",
            AppointmentStatus::Confirmed => "confirm",
            AppointmentStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppointmentStatus::Pending),
            "contacted" => Some(AppointmentStatus::Contacted),
            "confirm" => Some(AppointmentStatus::Confirmed),
            "completed" => Some(AppointmentStatus::Completed),
            _ => None,
        }
    }
}

/// Shop-floor repair progress, shown on the public tracking page.
pub const REPAIR_STATUSES: [&str; 8] = [
    "pending_inspection",
    "under_diagnosis",
    "waiting_for_insurance",
    "insurance_approved",
    "repair_in_progress",
    "waiting_for_parts",
    "testing_quality_check",
    "completed_ready",
];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "appointments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Customer-facing opaque identifier; looked up without authentication
    #[sea_orm(unique)]
    pub tracking_code: String,

    pub name: String,
    pub email: String,
    pub phone: String,

    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_year: Option<String>,
    pub vehicle_plate: Option<String>,

    pub service: Option<String>,
    pub preferred_date: Option<NaiveDate>,
    pub message: Option<String>,

    pub status: String,
    pub repair_status: Option<String>,
    pub current_repair_part: Option<String>,

    /// Cost estimate worksheet as submitted by the dashboard
    pub costing: Option<Json>,

    /// Assigned once by the estimate allocator, then immutable
    #[sea_orm(unique)]
    pub estimate_number: Option<String>,

    /// Public URLs of customer-uploaded damage photos
    pub damage_images: Json,

    /// Public URLs of the vehicle's ORCR document photos
    pub orcr_images: Json,

    pub status_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::appointment_part::Entity")]
    Parts,
    #[sea_orm(has_many = "super::feedback::Entity")]
    Feedback,
}

impl Related<super::appointment_part::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parts.def()
    }
}

impl Related<super::feedback::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Feedback.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}

impl Model {
    /// Damage image URLs as a string list; tolerates a malformed column.
    pub fn damage_image_urls(&self) -> Vec<String> {
        json_string_array(&self.damage_images)
    }
}

pub(crate) fn json_string_array(value: &Json) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
