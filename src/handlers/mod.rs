pub mod announcements;
pub mod appointments;
pub mod chat;
pub mod common;
pub mod feedback;
pub mod history;
pub mod inventory;
pub mod parts;
pub mod reports;
pub mod uploads;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub appointments: Arc<crate::services::appointments::AppointmentService>,
    pub estimates: Arc<crate::services::estimates::EstimateService>,
    pub history: Arc<crate::services::history::HistoryService>,
    pub inventory: Arc<crate::services::inventory::InventoryService>,
    pub parts: Arc<crate::services::parts::PartService>,
    pub feedback: Arc<crate::services::feedback::FeedbackService>,
    pub announcements: Arc<crate::services::announcements::AnnouncementService>,
    pub reports: Arc<crate::services::reports::ReportService>,
    pub ai: Arc<crate::services::ai::AiClient>,
    pub storage: Arc<crate::services::storage::ImageStore>,
}

impl AppServices {
    /// Build the AppServices container from shared infrastructure.
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        let storage = Arc::new(crate::services::storage::ImageStore::new(&config.storage));
        let ai = Arc::new(crate::services::ai::AiClient::new(config.ai.clone()));

        let appointments = Arc::new(crate::services::appointments::AppointmentService::new(
            db_pool.clone(),
            event_sender.clone(),
            storage.clone(),
        ));
        let estimates = Arc::new(crate::services::estimates::EstimateService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let history_service = crate::services::history::HistoryService::new(
            db_pool.clone(),
            event_sender.clone(),
            storage.clone(),
        );
        let history = Arc::new(history_service.clone());
        let inventory = Arc::new(crate::services::inventory::InventoryService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let parts = Arc::new(crate::services::parts::PartService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let feedback = Arc::new(crate::services::feedback::FeedbackService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let announcements = Arc::new(crate::services::announcements::AnnouncementService::new(
            db_pool,
            event_sender,
        ));
        let reports = Arc::new(crate::services::reports::ReportService::new(
            history_service,
            ai.clone(),
        ));

        Self {
            appointments,
            estimates,
            history,
            inventory,
            parts,
            feedback,
            announcements,
            reports,
            ai,
            storage,
        }
    }
}
