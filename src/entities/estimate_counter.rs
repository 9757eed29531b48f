use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Month-scoped estimate sequence counter.
///
/// `value` is the last sequence issued for the month. Reservation happens
/// through a conditional `value = value + 1 WHERE value = <observed>` update,
/// which is the atomic increment-and-fetch primitive the allocator relies on;
/// a plain read-then-write here would reintroduce duplicate estimate numbers
/// under concurrent allocation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "estimate_counters")]
pub struct Model {
    /// `YYYYMM` month key
    #[sea_orm(primary_key, auto_increment = false)]
    pub month: String,

    /// Last issued sequence for the month
    pub value: i64,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
