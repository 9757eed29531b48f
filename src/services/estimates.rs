//! Sequential estimate number allocation.
//!
//! Estimate numbers are `YYYYMM-####`: month-scoped, monotonically
//! increasing, unique across the union of active appointments and archived
//! history, and never reassigned once placed on an appointment.
//!
//! Reservation goes through the `estimate_counters` table with a conditional
//! increment (`value = value + 1 WHERE value = <observed>`). Two concurrent
//! allocations can both observe the same counter value, but only one
//! conditional update wins; the loser retries against the fresh value. The
//! counter is seeded lazily on the first allocation of a month from the
//! highest sequence already present in either record set, which keeps old
//! data consistent when the counter table starts empty.

use crate::{
    entities::{
        appointment::{self, Entity as AppointmentEntity},
        appointment_history::{self, Entity as HistoryEntity},
        estimate_counter::{self, Entity as CounterEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Bounded retries for counter contention. Each round trips one SELECT and
/// one conditional UPDATE, so even a pathological burst settles quickly.
const MAX_RESERVE_ATTEMPTS: u32 = 16;

/// `YYYYMM` key for the current calendar month.
pub fn current_month_key() -> String {
    Utc::now().format("%Y%m").to_string()
}

/// Numeric suffix after the final hyphen of an estimate number.
///
/// Comparison must be numeric: once a month passes 9999 estimates the
/// sequence gains a digit and lexicographic ordering would put `10000`
/// before `9999`.
fn sequence_suffix(estimate_number: &str) -> Option<i64> {
    estimate_number
        .rsplit('-')
        .next()
        .and_then(|suffix| suffix.parse::<i64>().ok())
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Service that assigns estimate numbers to appointments
#[derive(Clone)]
pub struct EstimateService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl EstimateService {
    /// Creates a new estimate service instance
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Assigns an estimate number to the appointment, or returns the one it
    /// already carries. Idempotent: repeated calls for the same appointment
    /// always yield the same number.
    #[instrument(skip(self), fields(appointment_id = %appointment_id))]
    pub async fn allocate(&self, appointment_id: Uuid) -> Result<String, ServiceError> {
        let db = &*self.db_pool;

        let appointment = AppointmentEntity::find_by_id(appointment_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound("Appointment not found".to_string()))?;

        if let Some(existing) = appointment
            .estimate_number
            .as_deref()
            .filter(|number| !number.is_empty())
        {
            debug!(estimate_number = %existing, "Appointment already numbered");
            return Ok(existing.to_string());
        }

        let month = current_month_key();
        let sequence = self.reserve_sequence(&month).await?;
        let estimate_number = format!("{month}-{sequence:04}");

        // Conditional write: only an appointment still without a number takes
        // this one. Losing the race means another allocation already
        // assigned; that stored number wins and this sequence becomes a gap.
        let updated = AppointmentEntity::update_many()
            .col_expr(
                appointment::Column::EstimateNumber,
                Expr::value(estimate_number.clone()),
            )
            .col_expr(appointment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(appointment::Column::Id.eq(appointment_id))
            .filter(appointment::Column::EstimateNumber.is_null())
            .exec(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if updated.rows_affected == 0 {
            let stored = AppointmentEntity::find_by_id(appointment_id)
                .one(db)
                .await
                .map_err(ServiceError::DatabaseError)?
                .and_then(|model| model.estimate_number)
                .ok_or_else(|| {
                    ServiceError::Conflict(format!(
                        "Appointment {appointment_id} has no estimate number after a contended allocation"
                    ))
                })?;

            debug!(estimate_number = %stored, "Concurrent allocation won; returning stored number");
            return Ok(stored);
        }

        info!(estimate_number = %estimate_number, "Estimate number assigned");

        if let Err(e) = self
            .event_sender
            .send(Event::EstimateAssigned {
                appointment_id,
                estimate_number: estimate_number.clone(),
            })
            .await
        {
            warn!(error = %e, appointment_id = %appointment_id, "Failed to send estimate event");
        }

        Ok(estimate_number)
    }

    /// Atomically reserves the next sequence for a month.
    async fn reserve_sequence(&self, month: &str) -> Result<i64, ServiceError> {
        let db = &*self.db_pool;

        for attempt in 0..MAX_RESERVE_ATTEMPTS {
            let counter = CounterEntity::find_by_id(month.to_owned())
                .one(db)
                .await
                .map_err(ServiceError::DatabaseError)?;

            match counter {
                Some(row) => {
                    let claimed = CounterEntity::update_many()
                        .col_expr(
                            estimate_counter::Column::Value,
                            Expr::col(estimate_counter::Column::Value).add(1),
                        )
                        .col_expr(estimate_counter::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(estimate_counter::Column::Month.eq(month))
                        .filter(estimate_counter::Column::Value.eq(row.value))
                        .exec(db)
                        .await
                        .map_err(ServiceError::DatabaseError)?;

                    if claimed.rows_affected == 1 {
                        return Ok(row.value + 1);
                    }

                    debug!(month, attempt, "Estimate counter contended; retrying");
                }
                None => {
                    let seed = self.highest_assigned_sequence(month).await?;
                    let model = estimate_counter::ActiveModel {
                        month: Set(month.to_owned()),
                        value: Set(seed + 1),
                        updated_at: Set(Utc::now()),
                    };

                    match model.insert(db).await {
                        Ok(_) => return Ok(seed + 1),
                        Err(err) if is_unique_violation(&err) => {
                            debug!(month, attempt, "Counter seeded concurrently; retrying");
                        }
                        Err(err) => return Err(ServiceError::DatabaseError(err)),
                    }
                }
            }
        }

        Err(ServiceError::Conflict(format!(
            "Could not reserve an estimate sequence for {month} after {MAX_RESERVE_ATTEMPTS} attempts"
        )))
    }

    /// Highest numeric sequence already assigned for the month, across both
    /// the active set and history. Zero when the month is untouched.
    async fn highest_assigned_sequence(&self, month: &str) -> Result<i64, ServiceError> {
        let db = &*self.db_pool;
        let prefix = format!("{month}-%");

        let active = AppointmentEntity::find()
            .filter(appointment::Column::EstimateNumber.like(prefix.clone()))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let archived = HistoryEntity::find()
            .filter(appointment_history::Column::EstimateNumber.like(prefix))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let highest = active
            .iter()
            .filter_map(|model| model.estimate_number.as_deref())
            .chain(
                archived
                    .iter()
                    .filter_map(|model| model.estimate_number.as_deref()),
            )
            .filter_map(sequence_suffix)
            .max()
            .unwrap_or(0);

        Ok(highest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_parsing_takes_the_part_after_the_last_hyphen() {
        assert_eq!(sequence_suffix("202608-0001"), Some(1));
        assert_eq!(sequence_suffix("202608-0042"), Some(42));
        assert_eq!(sequence_suffix("202608-10000"), Some(10000));
        assert_eq!(sequence_suffix("garbage"), None);
        assert_eq!(sequence_suffix("202608-"), None);
    }

    #[test]
    fn month_key_is_six_digits() {
        let key = current_month_key();
        assert_eq!(key.len(), 6);
        assert!(key.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn formatting_pads_to_four_digits_and_grows_naturally() {
        assert_eq!(format!("{}-{:04}", "202608", 7), "202608-0007");
        assert_eq!(format!("{}-{:04}", "202608", 9999), "202608-9999");
        // Past four digits the number widens instead of wrapping
        assert_eq!(format!("{}-{:04}", "202608", 10000), "202608-10000");
    }
}
