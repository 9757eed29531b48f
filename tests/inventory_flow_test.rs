//! Inventory audit trail, the atomic decrement path, parts-room side
//! effects, and the one-feedback-per-appointment rule.

mod common;

use autoworx_api as api;

use api::entities::{appointment_part, inventory_item, inventory_log};
use api::errors::ServiceError;
use api::services::feedback::CreateFeedbackRequest;
use api::services::inventory::{CreateInventoryItemRequest, UpdateInventoryItemRequest};
use api::services::parts::CreatePartRequest;
use common::{book_test_appointment, spawn_app, TestApp};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

const ADMIN: &str = "shop@autoworx.ph";

async fn stock_item(app: &TestApp, name: &str, quantity: i32) -> inventory_item::Model {
    app.services
        .inventory
        .create_item(
            CreateInventoryItemRequest {
                name: name.to_string(),
                brand: Some("OEM".to_string()),
                category: Some("Brakes".to_string()),
                quantity,
                unit_price: Some(Decimal::new(149_50, 2)),
                low_stock_threshold: None,
            },
            ADMIN,
        )
        .await
        .expect("item created")
}

async fn logs_for(app: &TestApp, inventory_id: Uuid) -> Vec<inventory_log::Model> {
    app.services
        .inventory
        .list_logs(inventory_id)
        .await
        .expect("logs listed")
}

#[tokio::test]
async fn creating_an_item_logs_the_initial_intake() {
    let app = spawn_app().await;
    let item = stock_item(&app, "Brake Pads", 12).await;

    let logs = logs_for(&app, item.id).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].movement, "IN");
    assert_eq!(logs[0].quantity, 12);
    assert_eq!(logs[0].reason, "Initial stock entry");
    assert_eq!(logs[0].performed_by, ADMIN);
}

#[tokio::test]
async fn manual_quantity_changes_log_the_signed_difference() {
    let app = spawn_app().await;
    let item = stock_item(&app, "Oil Filter", 10).await;

    let updated = app
        .services
        .inventory
        .update_item(
            item.id,
            UpdateInventoryItemRequest {
                quantity: Some(4),
                ..Default::default()
            },
            ADMIN,
        )
        .await
        .expect("update succeeds");
    assert_eq!(updated.quantity, 4);

    let logs = logs_for(&app, item.id).await;
    assert_eq!(logs.len(), 2);
    // Newest first: the OUT adjustment, then the initial intake
    assert_eq!(logs[0].movement, "OUT");
    assert_eq!(logs[0].quantity, 6);
    assert_eq!(logs[0].reason, "Manual stock adjustment");
}

#[tokio::test]
async fn consuming_more_than_available_is_rejected_without_mutation() {
    let app = spawn_app().await;
    let item = stock_item(&app, "Spark Plug", 3).await;

    let result = app
        .services
        .inventory
        .consume(item.id, 5, "Bench test", ADMIN)
        .await;
    assert!(matches!(result, Err(ServiceError::InsufficientStock(_))));

    let unchanged = app
        .services
        .inventory
        .get_item(item.id)
        .await
        .expect("query item")
        .expect("item exists");
    assert_eq!(unchanged.quantity, 3);

    // No OUT movement was logged for the failed consume
    let logs = logs_for(&app, item.id).await;
    assert_eq!(logs.len(), 1);
}

#[tokio::test]
async fn concurrent_consumers_cannot_overdraw_stock() {
    let app = spawn_app().await;
    let item = stock_item(&app, "Contested Belt", 2).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let inventory = app.services.inventory.clone();
        let id = item.id;
        handles.push(tokio::spawn(async move {
            inventory.consume(id, 1, "Race check", ADMIN).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.expect("task completes").is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 2, "exactly the available stock may be consumed");

    let drained = app
        .services
        .inventory
        .get_item(item.id)
        .await
        .expect("query item")
        .expect("item exists");
    assert_eq!(drained.quantity, 0);
}

#[tokio::test]
async fn warehouse_part_decrements_stock_and_logs_once() {
    let app = spawn_app().await;
    let booked = book_test_appointment(&app, "Parts Customer").await;
    let item = stock_item(&app, "Alternator", 5).await;

    let part = app
        .services
        .parts
        .create_part(
            CreatePartRequest {
                appointment_id: booked.id,
                name: "Alternator".to_string(),
                brand: Some("OEM".to_string()),
                part_type: Some("Electrical".to_string()),
                price: Some(Decimal::new(4_500_00, 2)),
                quantity: 2,
                status: None,
                inventory_id: Some(item.id),
            },
            ADMIN,
        )
        .await
        .expect("part created");

    assert_eq!(part.inventory_id, Some(item.id));

    let stocked = app
        .services
        .inventory
        .get_item(item.id)
        .await
        .expect("query item")
        .expect("item exists");
    assert_eq!(stocked.quantity, 3);

    let logs = logs_for(&app, item.id).await;
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].movement, "OUT");
    assert_eq!(logs[0].quantity, 2);
    assert_eq!(logs[0].reason, "Assigned to unit via Parts Room");
}

#[tokio::test]
async fn insufficient_stock_rejects_the_part_entirely() {
    let app = spawn_app().await;
    let booked = book_test_appointment(&app, "Greedy Order").await;
    let item = stock_item(&app, "Radiator", 1).await;

    let result = app
        .services
        .parts
        .create_part(
            CreatePartRequest {
                appointment_id: booked.id,
                name: "Radiator".to_string(),
                brand: None,
                part_type: None,
                price: None,
                quantity: 3,
                status: None,
                inventory_id: Some(item.id),
            },
            ADMIN,
        )
        .await;
    assert!(matches!(result, Err(ServiceError::InsufficientStock(_))));

    // The transaction rolled back: no part row, stock untouched
    let part_count = appointment_part::Entity::find()
        .filter(appointment_part::Column::AppointmentId.eq(booked.id))
        .count(&*app.db)
        .await
        .expect("count parts");
    assert_eq!(part_count, 0);

    let stocked = app
        .services
        .inventory
        .get_item(item.id)
        .await
        .expect("query item")
        .expect("item exists");
    assert_eq!(stocked.quantity, 1);
}

#[tokio::test]
async fn parts_without_inventory_reference_leave_stock_alone() {
    let app = spawn_app().await;
    let booked = book_test_appointment(&app, "Outside Part").await;

    let part = app
        .services
        .parts
        .create_part(
            CreatePartRequest {
                appointment_id: booked.id,
                name: "Custom Bracket".to_string(),
                brand: None,
                part_type: Some("Fabrication".to_string()),
                price: Some(Decimal::new(800_00, 2)),
                quantity: 1,
                status: None,
                inventory_id: None,
            },
            ADMIN,
        )
        .await
        .expect("part created");

    assert_eq!(part.status, "pending");
    assert!(part.inventory_id.is_none());
}

#[tokio::test]
async fn duplicate_category_names_are_a_conflict() {
    let app = spawn_app().await;

    app.services
        .inventory
        .create_category("Engine")
        .await
        .expect("category created");

    let duplicate = app.services.inventory.create_category("Engine").await;
    assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn feedback_is_accepted_once_per_appointment() {
    let app = spawn_app().await;
    let booked = book_test_appointment(&app, "Happy Customer").await;

    let request = |comment: &str| CreateFeedbackRequest {
        appointment_id: booked.id,
        rating: 5,
        comment: Some(comment.to_string()),
        customer_name: Some("Happy Customer".to_string()),
        service: "Preventive Maintenance".to_string(),
    };

    app.services
        .feedback
        .submit(request("Great service"))
        .await
        .expect("first submission succeeds");

    let second = app.services.feedback.submit(request("Trying again")).await;
    assert!(matches!(second, Err(ServiceError::ValidationError(_))));
}
