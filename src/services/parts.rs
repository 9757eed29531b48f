use crate::{
    entities::{
        appointment::Entity as AppointmentEntity,
        appointment_part::{self, Entity as PartEntity, Model as PartModel},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::consume_stock,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

const PARTS_ROOM_REASON: &str = "Assigned to unit via Parts Room";

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreatePartRequest {
    pub appointment_id: Uuid,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    pub brand: Option<String>,
    pub part_type: Option<String>,
    pub price: Option<Decimal>,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    #[serde(default = "default_part_quantity")]
    pub quantity: i32,

    pub status: Option<String>,

    /// Warehouse item to pull this part from; stock is decremented
    /// atomically when present
    pub inventory_id: Option<Uuid>,
}

fn default_part_quantity() -> i32 {
    1
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdatePartRequest {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub part_type: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub status: Option<String>,
}

/// Service for appointment part line items
#[derive(Clone)]
pub struct PartService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl PartService {
    /// Creates a new part service instance
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Parts attached to one appointment, newest first
    #[instrument(skip(self))]
    pub async fn list_for_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Vec<PartModel>, ServiceError> {
        let db = &*self.db_pool;

        PartEntity::find()
            .filter(appointment_part::Column::AppointmentId.eq(appointment_id))
            .order_by_desc(appointment_part::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Attaches a part to an appointment.
    ///
    /// When the part is pulled from the warehouse, the insert and the stock
    /// decrement commit together: a part never exists without its matching
    /// OUT movement, and insufficient stock rejects the part entirely.
    #[instrument(skip(self, request), fields(appointment_id = %request.appointment_id))]
    pub async fn create_part(
        &self,
        request: CreatePartRequest,
        performed_by: &str,
    ) -> Result<PartModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;

        AppointmentEntity::find_by_id(request.appointment_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound("Appointment not found".to_string()))?;

        let part_id = Uuid::new_v4();
        let performed_by = performed_by.to_string();

        let part = db
            .transaction::<_, PartModel, ServiceError>(move |txn| {
                Box::pin(async move {
                    let part = appointment_part::ActiveModel {
                        id: Set(part_id),
                        appointment_id: Set(request.appointment_id),
                        name: Set(request.name),
                        brand: Set(request.brand),
                        part_type: Set(request.part_type),
                        price: Set(request.price.unwrap_or(Decimal::ZERO)),
                        quantity: Set(request.quantity),
                        status: Set(request.status.unwrap_or_else(|| "pending".to_string())),
                        inventory_id: Set(request.inventory_id),
                        created_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?;

                    if let Some(inventory_id) = request.inventory_id {
                        consume_stock(
                            txn,
                            inventory_id,
                            request.quantity,
                            PARTS_ROOM_REASON,
                            &performed_by,
                        )
                        .await?;
                    }

                    Ok(part)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            part_id = %part.id,
            appointment_id = %part.appointment_id,
            from_inventory = part.inventory_id.is_some(),
            "Part assigned"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::PartAssigned {
                appointment_id: part.appointment_id,
                part_id: part.id,
                from_inventory: part.inventory_id.is_some(),
            })
            .await
        {
            warn!(error = %e, part_id = %part.id, "Failed to send part event");
        }

        Ok(part)
    }

    /// Updates a part's descriptive fields.
    ///
    /// Quantity edits here do not touch the warehouse; stock only moves at
    /// part creation.
    #[instrument(skip(self, request), fields(part_id = %part_id))]
    pub async fn update_part(
        &self,
        part_id: Uuid,
        request: UpdatePartRequest,
    ) -> Result<PartModel, ServiceError> {
        if let Some(quantity) = request.quantity {
            if quantity < 1 {
                return Err(ServiceError::ValidationError(
                    "Quantity must be at least 1".to_string(),
                ));
            }
        }

        let db = &*self.db_pool;

        let part = PartEntity::find_by_id(part_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound("Part not found".to_string()))?;

        let mut active: appointment_part::ActiveModel = part.into();

        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(brand) = request.brand {
            active.brand = Set(Some(brand));
        }
        if let Some(part_type) = request.part_type {
            active.part_type = Set(Some(part_type));
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(quantity) = request.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(status) = request.status {
            active.status = Set(status);
        }

        active.update(db).await.map_err(ServiceError::DatabaseError)
    }

    /// Removes a part line item. Stock is not returned to the warehouse;
    /// restocking is a deliberate inventory adjustment.
    #[instrument(skip(self))]
    pub async fn delete_part(&self, part_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let deleted = PartEntity::delete_by_id(part_id)
            .exec(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if deleted.rows_affected == 0 {
            return Err(ServiceError::NotFound("Part not found".to_string()));
        }

        if let Err(e) = self.event_sender.send(Event::PartRemoved(part_id)).await {
            warn!(error = %e, part_id = %part_id, "Failed to send part event");
        }

        Ok(())
    }
}
