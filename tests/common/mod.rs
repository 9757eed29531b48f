//! Shared setup for integration tests: a migrated temporary SQLite database
//! plus the full service stack wired the way `main` wires it.
#![allow(dead_code)]

use autoworx_api as api;

use api::config::{AiConfig, AppConfig, StorageConfig};
use api::entities::appointment::Model as AppointmentModel;
use api::services::appointments::CreateAppointmentRequest;
use std::sync::Arc;
use tempfile::NamedTempFile;

pub struct TestApp {
    pub db: Arc<api::db::DbPool>,
    pub services: api::handlers::AppServices,
    pub state: api::AppState,
    pub auth: Arc<api::auth::AuthService>,
    // Keeps the SQLite file alive for the duration of the test
    _db_file: NamedTempFile,
}

pub fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        session_secret: "integration-test-session-secret-0a1b2c3d4e5f6g7h8i9j-klmnop-qrstuv"
            .to_string(),
        session_expiration: 3600,
        auth_issuer: "autoworx-api".to_string(),
        auth_audience: "autoworx-admin".to_string(),
        admin_emails: "shop@autoworx.ph".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "development".to_string(),
        log_level: "info".to_string(),
        log_json: false,
        auto_migrate: false,
        cors_allowed_origins: None,
        cors_allow_any_origin: false,
        db_max_connections: 10,
        db_min_connections: 1,
        db_connect_timeout_secs: 30,
        db_idle_timeout_secs: 600,
        db_acquire_timeout_secs: 8,
        request_timeout_secs: 30,
        max_body_size: 10 * 1024 * 1024,
        max_upload_files: 10,
        event_channel_capacity: 256,
        ai: AiConfig {
            openrouter_api_key: None,
            // Unroutable: tests never reach a real provider
            openrouter_base_url: "http://127.0.0.1:1".to_string(),
            openrouter_model: "test".to_string(),
            ollama_base_url: "http://127.0.0.1:1".to_string(),
            ollama_model: "test".to_string(),
            request_timeout_secs: 1,
        },
        storage: StorageConfig {
            // Unroutable: best-effort cleanup fails fast and is swallowed
            base_url: "http://127.0.0.1:1".to_string(),
            bucket: "damage-images".to_string(),
            service_key: None,
            request_timeout_secs: 1,
        },
    }
}

pub async fn spawn_app() -> TestApp {
    let db_file = NamedTempFile::new().expect("temp db file");
    let database_url = format!("sqlite://{}?mode=rwc", db_file.path().display());

    let db = api::db::establish_connection(&database_url)
        .await
        .expect("database connection");
    api::db::run_migrations(&db).await.expect("migrations");
    let db = Arc::new(db);

    // Drain events so senders never block
    let (tx, mut rx) = tokio::sync::mpsc::channel(256);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });
    let event_sender = api::events::EventSender::new(tx);

    let cfg = test_config(&database_url);
    let services =
        api::handlers::AppServices::new(db.clone(), Arc::new(event_sender.clone()), &cfg);
    let auth = Arc::new(api::auth::AuthService::new(
        api::auth::AuthConfig::from_app_config(&cfg),
        cfg.admin_allowlist(),
    ));

    let state = api::AppState {
        db: db.clone(),
        config: cfg,
        event_sender,
        services: services.clone(),
        auth: auth.clone(),
    };

    TestApp {
        db,
        services,
        state,
        auth,
        _db_file: db_file,
    }
}

#[allow(dead_code)]
pub async fn book_test_appointment(app: &TestApp, name: &str) -> AppointmentModel {
    app.services
        .appointments
        .create_appointment(CreateAppointmentRequest {
            tracking_code: None,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            phone: "09171234567".to_string(),
            vehicle_make: Some("Toyota".to_string()),
            vehicle_model: Some("Vios".to_string()),
            vehicle_year: Some("2019".to_string()),
            vehicle_plate: Some("ABC-1234".to_string()),
            service: Some("Preventive Maintenance".to_string()),
            preferred_date: None,
            message: None,
            damage_images: Vec::new(),
            orcr_images: Vec::new(),
        })
        .await
        .expect("appointment booked")
}
