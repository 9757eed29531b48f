use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Denormalized snapshot of an appointment taken at archival time.
///
/// Immutable once inserted, except for administrative deletion. Never
/// referenced back from the active set.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "appointment_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Id the appointment had while it was active
    pub original_id: Uuid,

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

    /// Lifecycle status at the moment of archival
    pub final_status: String,
    pub repair_status: Option<String>,
    pub current_repair_part: Option<String>,

    pub costing: Option<Json>,
    pub estimate_number: Option<String>,

    pub original_created_at: DateTime<Utc>,
    /// Set only when the appointment was archived in the terminal
    /// `completed` status
    pub completed_at: Option<DateTime<Utc>>,
    pub archived_reason: String,
    pub archived_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.archived_at {
            active_model.archived_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
