//! Archival workflow: the active-to-history migration and its failure
//! semantics.

mod common;

use autoworx_api as api;

use api::entities::{appointment, appointment_history};
use api::errors::ServiceError;
use api::services::appointments::UpdateAppointmentRequest;
use common::{book_test_appointment, spawn_app};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

#[tokio::test]
async fn archive_moves_the_appointment_into_history() {
    let app = spawn_app().await;
    let booked = book_test_appointment(&app, "Archive Me").await;

    let record = app
        .services
        .history
        .archive(booked.id, Some("Job closed".to_string()))
        .await
        .expect("archive succeeds");

    // Present exactly once in history, with the supplied reason
    let history_count = appointment_history::Entity::find()
        .filter(appointment_history::Column::OriginalId.eq(booked.id))
        .count(&*app.db)
        .await
        .expect("count history");
    assert_eq!(history_count, 1);
    assert_eq!(record.original_id, booked.id);
    assert_eq!(record.archived_reason, "Job closed");
    assert_eq!(record.tracking_code, booked.tracking_code);
    assert_eq!(record.final_status, "pending");

    // Absent from the active set
    let active = appointment::Entity::find_by_id(booked.id)
        .one(&*app.db)
        .await
        .expect("query active");
    assert!(active.is_none());
}

#[tokio::test]
async fn archive_uses_the_default_reason_when_none_is_given() {
    let app = spawn_app().await;
    let booked = book_test_appointment(&app, "Default Reason").await;

    let record = app
        .services
        .history
        .archive(booked.id, None)
        .await
        .expect("archive succeeds");

    assert_eq!(record.archived_reason, "Archived by admin");
}

#[tokio::test]
async fn completed_at_is_stamped_only_for_completed_appointments() {
    let app = spawn_app().await;

    // Archived while still pending: no completion timestamp
    let pending = book_test_appointment(&app, "Still Pending").await;
    let record = app
        .services
        .history
        .archive(pending.id, None)
        .await
        .expect("archive succeeds");
    assert!(record.completed_at.is_none());

    // Completed first, then archived: stamped
    let done = book_test_appointment(&app, "All Done").await;
    app.services
        .appointments
        .update_appointment(
            done.id,
            UpdateAppointmentRequest {
                status: Some("completed".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("status update");

    let record = app
        .services
        .history
        .archive(done.id, None)
        .await
        .expect("archive succeeds");
    assert!(record.completed_at.is_some());
    assert_eq!(record.final_status, "completed");
}

#[tokio::test]
async fn archiving_a_missing_appointment_is_not_found() {
    let app = spawn_app().await;

    let result = app.services.history.archive(Uuid::new_v4(), None).await;

    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn archiving_twice_fails_the_second_time() {
    let app = spawn_app().await;
    let booked = book_test_appointment(&app, "Once Only").await;

    app.services
        .history
        .archive(booked.id, None)
        .await
        .expect("first archive succeeds");

    let second = app.services.history.archive(booked.id, None).await;
    assert!(matches!(second, Err(ServiceError::NotFound(_))));

    // Still exactly one history record
    let history_count = appointment_history::Entity::find()
        .filter(appointment_history::Column::OriginalId.eq(booked.id))
        .count(&*app.db)
        .await
        .expect("count history");
    assert_eq!(history_count, 1);
}

#[tokio::test]
async fn history_listing_returns_newest_first() {
    let app = spawn_app().await;

    for i in 0..3 {
        let booked = book_test_appointment(&app, &format!("Listed {i}")).await;
        app.services
            .history
            .archive(booked.id, None)
            .await
            .expect("archive succeeds");
    }

    let listed = app
        .services
        .history
        .list(1, 10)
        .await
        .expect("list history");

    assert_eq!(listed.total, 3);
    assert_eq!(listed.records.len(), 3);
    let mut stamps: Vec<_> = listed.records.iter().map(|r| r.archived_at).collect();
    let sorted = {
        let mut s = stamps.clone();
        s.sort_by(|a, b| b.cmp(a));
        s
    };
    assert_eq!(stamps, sorted);
    stamps.dedup();
    assert!(!stamps.is_empty());
}

#[tokio::test]
async fn history_deletion_is_permanent_and_reported_once() {
    let app = spawn_app().await;
    let booked = book_test_appointment(&app, "Delete From History").await;

    let record = app
        .services
        .history
        .archive(booked.id, None)
        .await
        .expect("archive succeeds");

    app.services
        .history
        .delete(record.id)
        .await
        .expect("delete succeeds");

    let gone = appointment_history::Entity::find_by_id(record.id)
        .one(&*app.db)
        .await
        .expect("query history");
    assert!(gone.is_none());

    let again = app.services.history.delete(record.id).await;
    assert!(matches!(again, Err(ServiceError::NotFound(_))));
}
