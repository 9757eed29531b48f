use crate::{
    entities::announcement::{self, Entity as AnnouncementEntity, Model as AnnouncementModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// The dashboard shows only the most recent few announcements
const ACTIVE_ANNOUNCEMENT_LIMIT: u64 = 5;

/// Service for dashboard announcements
#[derive(Clone)]
pub struct AnnouncementService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl AnnouncementService {
    /// Creates a new announcement service instance
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// The five most recent active announcements, newest first
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> Result<Vec<AnnouncementModel>, ServiceError> {
        let db = &*self.db_pool;

        AnnouncementEntity::find()
            .filter(announcement::Column::IsActive.eq(true))
            .order_by_desc(announcement::Column::CreatedAt)
            .limit(ACTIVE_ANNOUNCEMENT_LIMIT)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Posts a new announcement
    #[instrument(skip(self, content), fields(author = %author_email))]
    pub async fn post(
        &self,
        content: &str,
        author_name: Option<&str>,
        author_email: &str,
    ) -> Result<AnnouncementModel, ServiceError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::ValidationError(
                "Content is required".to_string(),
            ));
        }

        let db = &*self.db_pool;

        let record = announcement::ActiveModel {
            id: Set(Uuid::new_v4()),
            content: Set(content.to_string()),
            author_name: Set(author_name.unwrap_or("Admin").to_string()),
            author_email: Set(author_email.to_string()),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .map_err(ServiceError::DatabaseError)?;

        info!(announcement_id = %record.id, "Announcement posted");

        if let Err(e) = self
            .event_sender
            .send(Event::AnnouncementPosted(record.id))
            .await
        {
            warn!(error = %e, announcement_id = %record.id, "Failed to send announcement event");
        }

        Ok(record)
    }

    /// Soft-deletes an announcement (keeps the author trail)
    #[instrument(skip(self))]
    pub async fn retire(&self, announcement_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let record = AnnouncementEntity::find_by_id(announcement_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound("Announcement not found".to_string()))?;

        let mut active: announcement::ActiveModel = record.into();
        active.is_active = Set(false);
        active.update(db).await.map_err(ServiceError::DatabaseError)?;

        if let Err(e) = self
            .event_sender
            .send(Event::AnnouncementRetired(announcement_id))
            .await
        {
            warn!(error = %e, announcement_id = %announcement_id, "Failed to send announcement event");
        }

        Ok(())
    }
}
