//! Estimate number allocation: format, idempotence, monotonicity, and the
//! duplicate-free guarantee under concurrent allocation.

mod common;

use autoworx_api as api;

use api::entities::appointment;
use api::errors::ServiceError;
use api::services::estimates::current_month_key;
use common::{book_test_appointment, spawn_app};
use regex::Regex;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use std::collections::HashSet;
use uuid::Uuid;

#[tokio::test]
async fn allocation_matches_the_wire_format() {
    let app = spawn_app().await;
    let appointment = book_test_appointment(&app, "Format Case").await;

    let number = app
        .services
        .estimates
        .allocate(appointment.id)
        .await
        .expect("allocation succeeds");

    let pattern = Regex::new(r"^\d{6}-\d{4,}$").unwrap();
    assert!(
        pattern.is_match(&number),
        "estimate number {number} does not match YYYYMM-####"
    );
    assert!(number.starts_with(&current_month_key()));
}

#[tokio::test]
async fn allocation_is_idempotent() {
    let app = spawn_app().await;
    let appointment = book_test_appointment(&app, "Idempotent Case").await;

    let first = app
        .services
        .estimates
        .allocate(appointment.id)
        .await
        .expect("first allocation");
    let second = app
        .services
        .estimates
        .allocate(appointment.id)
        .await
        .expect("second allocation");

    assert_eq!(first, second);
}

#[tokio::test]
async fn unknown_appointment_is_not_found() {
    let app = spawn_app().await;

    let result = app.services.estimates.allocate(Uuid::new_v4()).await;

    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn sequences_are_strictly_increasing_within_a_month() {
    let app = spawn_app().await;

    let mut last = 0_i64;
    for i in 0..5 {
        let appointment = book_test_appointment(&app, &format!("Sequential {i}")).await;
        let number = app
            .services
            .estimates
            .allocate(appointment.id)
            .await
            .expect("allocation succeeds");

        let suffix: i64 = number.rsplit('-').next().unwrap().parse().unwrap();
        assert_eq!(suffix, last + 1, "sequence must advance by exactly one");
        last = suffix;
    }
}

#[tokio::test]
async fn counter_seeds_from_existing_numbers_in_the_active_set() {
    let app = spawn_app().await;

    // A pre-existing numbered appointment, as if assigned before the counter
    // table was introduced
    let seeded = book_test_appointment(&app, "Pre Existing").await;
    let mut active: appointment::ActiveModel = seeded.into();
    active.estimate_number = Set(Some(format!("{}-0041", current_month_key())));
    active
        .update(&*app.db)
        .await
        .expect("seed estimate number");

    let fresh = book_test_appointment(&app, "Fresh Case").await;
    let number = app
        .services
        .estimates
        .allocate(fresh.id)
        .await
        .expect("allocation succeeds");

    assert_eq!(number, format!("{}-0042", current_month_key()));
}

#[tokio::test]
async fn counter_seeds_from_archived_history_too() {
    let app = spawn_app().await;

    // Number an appointment, then archive it so the number only exists in
    // history
    let archived = book_test_appointment(&app, "Archived Case").await;
    let mut active: appointment::ActiveModel = archived.clone().into();
    active.estimate_number = Set(Some(format!("{}-0007", current_month_key())));
    active.update(&*app.db).await.expect("seed estimate number");

    app.services
        .history
        .archive(archived.id, None)
        .await
        .expect("archive succeeds");

    let fresh = book_test_appointment(&app, "Post Archive").await;
    let number = app
        .services
        .estimates
        .allocate(fresh.id)
        .await
        .expect("allocation succeeds");

    assert_eq!(number, format!("{}-0008", current_month_key()));
}

#[tokio::test]
async fn concurrent_allocations_never_collide() {
    let app = spawn_app().await;

    const WORKERS: usize = 8;
    let mut appointments = Vec::with_capacity(WORKERS);
    for i in 0..WORKERS {
        appointments.push(book_test_appointment(&app, &format!("Concurrent {i}")).await);
    }

    let mut handles = Vec::with_capacity(WORKERS);
    for appointment in &appointments {
        let estimates = app.services.estimates.clone();
        let id = appointment.id;
        handles.push(tokio::spawn(async move { estimates.allocate(id).await }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let number = handle
            .await
            .expect("task completes")
            .expect("allocation succeeds");
        assert!(
            numbers.insert(number.clone()),
            "duplicate estimate number issued: {number}"
        );
    }

    assert_eq!(numbers.len(), WORKERS);

    // The stored assignments agree with what the callers were told
    let stored: HashSet<String> = appointment::Entity::find()
        .all(&*app.db)
        .await
        .expect("fetch appointments")
        .into_iter()
        .filter_map(|model| model.estimate_number)
        .collect();
    assert_eq!(stored, numbers);
}
