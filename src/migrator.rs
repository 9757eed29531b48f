use anyhow::Result;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_appointments_table::Migration),
            Box::new(m20250301_000002_create_appointment_history_table::Migration),
            Box::new(m20250301_000003_create_estimate_counters_table::Migration),
            Box::new(m20250301_000004_create_inventory_tables::Migration),
            Box::new(m20250301_000005_create_appointment_parts_table::Migration),
            Box::new(m20250301_000006_create_feedback_table::Migration),
            Box::new(m20250301_000007_create_announcements_table::Migration),
        ]
    }
}

// Migration implementations

mod m20250301_000001_create_appointments_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_appointments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Appointments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Appointments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Appointments::TrackingCode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Appointments::Name).string().not_null())
                        .col(ColumnDef::new(Appointments::Email).string().not_null())
                        .col(ColumnDef::new(Appointments::Phone).string().not_null())
                        .col(ColumnDef::new(Appointments::VehicleMake).string().null())
                        .col(ColumnDef::new(Appointments::VehicleModel).string().null())
                        .col(ColumnDef::new(Appointments::VehicleYear).string().null())
                        .col(ColumnDef::new(Appointments::VehiclePlate).string().null())
                        .col(ColumnDef::new(Appointments::Service).string().null())
                        .col(ColumnDef::new(Appointments::PreferredDate).date().null())
                        .col(ColumnDef::new(Appointments::Message).text().null())
                        .col(
                            ColumnDef::new(Appointments::Status)
                                .string()
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(Appointments::RepairStatus).string().null())
                        .col(
                            ColumnDef::new(Appointments::CurrentRepairPart)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Appointments::Costing).json().null())
                        .col(
                            ColumnDef::new(Appointments::EstimateNumber)
                                .string()
                                .null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Appointments::DamageImages)
                                .json()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Appointments::OrcrImages).json().not_null())
                        .col(
                            ColumnDef::new(Appointments::StatusUpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Appointments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Appointments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_appointments_status")
                        .table(Appointments::Table)
                        .col(Appointments::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_appointments_created_at")
                        .table(Appointments::Table)
                        .col(Appointments::CreatedAt)
                        .to_owned(),
                )
                .await?;

            // The allocator scans this column with a month prefix
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_appointments_estimate_number")
                        .table(Appointments::Table)
                        .col(Appointments::EstimateNumber)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Appointments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Appointments {
        Table,
        Id,
        TrackingCode,
        Name,
        Email,
        Phone,
        VehicleMake,
        VehicleModel,
        VehicleYear,
        VehiclePlate,
        Service,
        PreferredDate,
        Message,
        Status,
        RepairStatus,
        CurrentRepairPart,
        Costing,
        EstimateNumber,
        DamageImages,
        OrcrImages,
        StatusUpdatedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000002_create_appointment_history_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_appointment_history_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AppointmentHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AppointmentHistory::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AppointmentHistory::OriginalId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AppointmentHistory::TrackingCode)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AppointmentHistory::Name).string().not_null())
                        .col(
                            ColumnDef::new(AppointmentHistory::Email)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AppointmentHistory::Phone)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AppointmentHistory::VehicleMake)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AppointmentHistory::VehicleModel)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AppointmentHistory::VehicleYear)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AppointmentHistory::VehiclePlate)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(AppointmentHistory::Service).string().null())
                        .col(
                            ColumnDef::new(AppointmentHistory::PreferredDate)
                                .date()
                                .null(),
                        )
                        .col(ColumnDef::new(AppointmentHistory::Message).text().null())
                        .col(
                            ColumnDef::new(AppointmentHistory::FinalStatus)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AppointmentHistory::RepairStatus)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AppointmentHistory::CurrentRepairPart)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(AppointmentHistory::Costing).json().null())
                        .col(
                            ColumnDef::new(AppointmentHistory::EstimateNumber)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AppointmentHistory::OriginalCreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AppointmentHistory::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AppointmentHistory::ArchivedReason)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AppointmentHistory::ArchivedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_appointment_history_archived_at")
                        .table(AppointmentHistory::Table)
                        .col(AppointmentHistory::ArchivedAt)
                        .to_owned(),
                )
                .await?;

            // The allocator scans this column with a month prefix
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_appointment_history_estimate_number")
                        .table(AppointmentHistory::Table)
                        .col(AppointmentHistory::EstimateNumber)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AppointmentHistory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum AppointmentHistory {
        Table,
        Id,
        OriginalId,
        TrackingCode,
        Name,
        Email,
        Phone,
        VehicleMake,
        VehicleModel,
        VehicleYear,
        VehiclePlate,
        Service,
        PreferredDate,
        Message,
        FinalStatus,
        RepairStatus,
        CurrentRepairPart,
        Costing,
        EstimateNumber,
        OriginalCreatedAt,
        CompletedAt,
        ArchivedReason,
        ArchivedAt,
    }
}

mod m20250301_000003_create_estimate_counters_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_estimate_counters_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(EstimateCounters::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(EstimateCounters::Month)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(EstimateCounters::Value)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(EstimateCounters::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(EstimateCounters::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum EstimateCounters {
        Table,
        Month,
        Value,
        UpdatedAt,
    }
}

mod m20250301_000004_create_inventory_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_inventory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::Name).string().not_null())
                        .col(ColumnDef::new(InventoryItems::Brand).string().null())
                        .col(ColumnDef::new(InventoryItems::Category).string().null())
                        .col(
                            ColumnDef::new(InventoryItems::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(InventoryItems::UnitPrice).decimal().null())
                        .col(
                            ColumnDef::new(InventoryItems::LowStockThreshold)
                                .integer()
                                .not_null()
                                .default(5),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_items_name")
                        .table(InventoryItems::Table)
                        .col(InventoryItems::Name)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventoryCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryCategories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryCategories::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(InventoryCategories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventoryLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryLogs::InventoryId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryLogs::Movement).string().not_null())
                        .col(
                            ColumnDef::new(InventoryLogs::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryLogs::Reason).string().not_null())
                        .col(
                            ColumnDef::new(InventoryLogs::PerformedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_logs_inventory_id")
                        .table(InventoryLogs::Table)
                        .col(InventoryLogs::InventoryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryLogs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryCategories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum InventoryItems {
        Table,
        Id,
        Name,
        Brand,
        Category,
        Quantity,
        UnitPrice,
        LowStockThreshold,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum InventoryCategories {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum InventoryLogs {
        Table,
        Id,
        InventoryId,
        Movement,
        Quantity,
        Reason,
        PerformedBy,
        CreatedAt,
    }
}

mod m20250301_000005_create_appointment_parts_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000005_create_appointment_parts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AppointmentParts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AppointmentParts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AppointmentParts::AppointmentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AppointmentParts::Name).string().not_null())
                        .col(ColumnDef::new(AppointmentParts::Brand).string().null())
                        .col(ColumnDef::new(AppointmentParts::PartType).string().null())
                        .col(
                            ColumnDef::new(AppointmentParts::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(AppointmentParts::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(AppointmentParts::Status)
                                .string()
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(AppointmentParts::InventoryId).uuid().null())
                        .col(
                            ColumnDef::new(AppointmentParts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_appointment_parts_appointment_id")
                        .table(AppointmentParts::Table)
                        .col(AppointmentParts::AppointmentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AppointmentParts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum AppointmentParts {
        Table,
        Id,
        AppointmentId,
        Name,
        Brand,
        PartType,
        Price,
        Quantity,
        Status,
        InventoryId,
        CreatedAt,
    }
}

mod m20250301_000006_create_feedback_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000006_create_feedback_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Feedback::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Feedback::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Feedback::AppointmentId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Feedback::Rating).small_integer().not_null())
                        .col(ColumnDef::new(Feedback::Comment).text().null())
                        .col(ColumnDef::new(Feedback::CustomerName).string().null())
                        .col(ColumnDef::new(Feedback::Service).string().not_null())
                        .col(
                            ColumnDef::new(Feedback::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Feedback::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Feedback {
        Table,
        Id,
        AppointmentId,
        Rating,
        Comment,
        CustomerName,
        Service,
        CreatedAt,
    }
}

mod m20250301_000007_create_announcements_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000007_create_announcements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Announcements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Announcements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Announcements::Content).text().not_null())
                        .col(
                            ColumnDef::new(Announcements::AuthorName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Announcements::AuthorEmail)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Announcements::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Announcements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Announcements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Announcements {
        Table,
        Id,
        Content,
        AuthorName,
        AuthorEmail,
        IsActive,
        CreatedAt,
    }
}

// Database migration CLI runner
pub async fn run_migration(db_url: &str) -> Result<()> {
    info!("Setting up database connection for migrations");

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;

    info!("Running database migrations");

    let result = Migrator::up(&db, None).await;

    match result {
        Ok(_) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}
