use crate::{
    entities::{
        inventory_category::{self, Entity as CategoryEntity, Model as CategoryModel},
        inventory_item::{self, Entity as ItemEntity, Model as ItemModel},
        inventory_log::{self, Entity as LogEntity, Model as LogModel, Movement},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateInventoryItemRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    pub low_stock_threshold: Option<i32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateInventoryItemRequest {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
    pub low_stock_threshold: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InventoryListResponse {
    pub items: Vec<ItemModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Writes a stock movement audit row. Runs on whatever connection the caller
/// is using so it can share a transaction with the quantity change.
async fn record_movement<C: ConnectionTrait>(
    conn: &C,
    inventory_id: Uuid,
    movement: Movement,
    quantity: i32,
    reason: &str,
    performed_by: &str,
) -> Result<LogModel, ServiceError> {
    inventory_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        inventory_id: Set(inventory_id),
        movement: Set(movement.as_str().to_string()),
        quantity: Set(quantity),
        reason: Set(reason.to_string()),
        performed_by: Set(performed_by.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::DatabaseError)
}

/// Atomic decrement-if-sufficient.
///
/// The quantity change and the sufficiency check are one conditional UPDATE,
/// so two concurrent consumers can never both spend the same stock the way a
/// read-modify-write would. Zero rows affected means either the item is gone
/// or the stock ran short; the two are distinguished with a follow-up read.
pub(crate) async fn consume_stock<C: ConnectionTrait>(
    conn: &C,
    inventory_id: Uuid,
    quantity: i32,
    reason: &str,
    performed_by: &str,
) -> Result<(), ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::ValidationError(
            "Quantity to consume must be positive".to_string(),
        ));
    }

    let result = ItemEntity::update_many()
        .col_expr(
            inventory_item::Column::Quantity,
            Expr::col(inventory_item::Column::Quantity).sub(quantity),
        )
        .col_expr(inventory_item::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(inventory_item::Column::Id.eq(inventory_id))
        .filter(inventory_item::Column::Quantity.gte(quantity))
        .exec(conn)
        .await
        .map_err(ServiceError::DatabaseError)?;

    if result.rows_affected == 0 {
        let item = ItemEntity::find_by_id(inventory_id)
            .one(conn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound("Inventory item not found".to_string()))?;

        return Err(ServiceError::InsufficientStock(format!(
            "Only {} left of {}",
            item.quantity, item.name
        )));
    }

    record_movement(conn, inventory_id, Movement::Out, quantity, reason, performed_by).await?;

    Ok(())
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Service for warehouse inventory with a mandatory audit trail
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl InventoryService {
    /// Creates a new inventory service instance
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a stock item and logs its initial intake
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_item(
        &self,
        request: CreateInventoryItemRequest,
        performed_by: &str,
    ) -> Result<ItemModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let item_id = Uuid::new_v4();
        let now = Utc::now();
        let performed_by = performed_by.to_string();

        let item = db
            .transaction::<_, ItemModel, ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = inventory_item::ActiveModel {
                        id: Set(item_id),
                        name: Set(request.name),
                        brand: Set(request.brand),
                        category: Set(request.category),
                        quantity: Set(request.quantity),
                        unit_price: Set(request.unit_price),
                        low_stock_threshold: Set(request.low_stock_threshold.unwrap_or(5)),
                        created_at: Set(now),
                        updated_at: Set(Some(now)),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?;

                    if item.quantity > 0 {
                        record_movement(
                            txn,
                            item.id,
                            Movement::In,
                            item.quantity,
                            "Initial stock entry",
                            &performed_by,
                        )
                        .await?;
                    }

                    Ok(item)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(item_id = %item.id, quantity = item.quantity, "Inventory item created");

        if let Err(e) = self
            .event_sender
            .send(Event::InventoryItemCreated(item.id))
            .await
        {
            warn!(error = %e, item_id = %item.id, "Failed to send inventory event");
        }

        Ok(item)
    }

    /// Retrieves one item by ID
    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: Uuid) -> Result<Option<ItemModel>, ServiceError> {
        let db = &*self.db_pool;

        ItemEntity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Lists items alphabetically with pagination
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<InventoryListResponse, ServiceError> {
        let db = &*self.db_pool;

        let paginator = ItemEntity::find()
            .order_by_asc(inventory_item::Column::Name)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count inventory items");
            ServiceError::DatabaseError(e)
        })?;

        let items = paginator.fetch_page(page.saturating_sub(1)).await.map_err(|e| {
            error!(error = %e, page = page, "Failed to fetch inventory page");
            ServiceError::DatabaseError(e)
        })?;

        Ok(InventoryListResponse {
            items,
            total,
            page,
            per_page,
        })
    }

    /// Items at or below their low-stock threshold
    #[instrument(skip(self))]
    pub async fn low_stock_items(&self) -> Result<Vec<ItemModel>, ServiceError> {
        let db = &*self.db_pool;

        ItemEntity::find()
            .filter(
                Expr::col(inventory_item::Column::Quantity)
                    .lte(Expr::col(inventory_item::Column::LowStockThreshold)),
            )
            .order_by_asc(inventory_item::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Applies admin field updates; a quantity change logs the signed
    /// difference as an IN or OUT movement
    #[instrument(skip(self, request), fields(item_id = %item_id))]
    pub async fn update_item(
        &self,
        item_id: Uuid,
        request: UpdateInventoryItemRequest,
        performed_by: &str,
    ) -> Result<ItemModel, ServiceError> {
        if let Some(quantity) = request.quantity {
            if quantity < 0 {
                return Err(ServiceError::ValidationError(
                    "Quantity cannot be negative".to_string(),
                ));
            }
        }

        let db = &*self.db_pool;
        let now = Utc::now();
        let performed_by = performed_by.to_string();

        let (item, moved) = db
            .transaction::<_, (ItemModel, Option<(Movement, i32)>), ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = ItemEntity::find_by_id(item_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::DatabaseError)?
                        .ok_or_else(|| {
                            ServiceError::NotFound("Inventory item not found".to_string())
                        })?;

                    let old_quantity = existing.quantity;
                    let mut active: inventory_item::ActiveModel = existing.into();

                    if let Some(name) = request.name {
                        active.name = Set(name);
                    }
                    if let Some(brand) = request.brand {
                        active.brand = Set(Some(brand));
                    }
                    if let Some(category) = request.category {
                        active.category = Set(Some(category));
                    }
                    if let Some(quantity) = request.quantity {
                        active.quantity = Set(quantity);
                    }
                    if let Some(unit_price) = request.unit_price {
                        active.unit_price = Set(Some(unit_price));
                    }
                    if let Some(threshold) = request.low_stock_threshold {
                        active.low_stock_threshold = Set(threshold);
                    }
                    active.updated_at = Set(Some(now));

                    let updated = active.update(txn).await.map_err(ServiceError::DatabaseError)?;

                    let moved = match request.quantity {
                        Some(new_quantity) if new_quantity != old_quantity => {
                            let diff = new_quantity - old_quantity;
                            let movement = if diff > 0 { Movement::In } else { Movement::Out };
                            record_movement(
                                txn,
                                item_id,
                                movement,
                                diff.abs(),
                                "Manual stock adjustment",
                                &performed_by,
                            )
                            .await?;
                            Some((movement, diff.abs()))
                        }
                        _ => None,
                    };

                    Ok((updated, moved))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        if let Some((movement, quantity)) = moved {
            if let Err(e) = self
                .event_sender
                .send(Event::StockMoved {
                    inventory_id: item_id,
                    movement: movement.as_str().to_string(),
                    quantity,
                    reason: "Manual stock adjustment".to_string(),
                })
                .await
            {
                warn!(error = %e, item_id = %item_id, "Failed to send stock event");
            }
        }

        Ok(item)
    }

    /// Consumes stock through the atomic decrement path and logs it
    #[instrument(skip(self), fields(inventory_id = %inventory_id))]
    pub async fn consume(
        &self,
        inventory_id: Uuid,
        quantity: i32,
        reason: &str,
        performed_by: &str,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let reason_owned = reason.to_string();
        let performed_by = performed_by.to_string();

        // Transactional so the decrement and its audit row commit together
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                consume_stock(txn, inventory_id, quantity, &reason_owned, &performed_by).await
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })?;

        if let Err(e) = self
            .event_sender
            .send(Event::StockMoved {
                inventory_id,
                movement: Movement::Out.as_str().to_string(),
                quantity,
                reason: reason.to_string(),
            })
            .await
        {
            warn!(error = %e, inventory_id = %inventory_id, "Failed to send stock event");
        }

        Ok(())
    }

    /// Deletes a stock item
    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let deleted = ItemEntity::delete_by_id(item_id)
            .exec(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if deleted.rows_affected == 0 {
            return Err(ServiceError::NotFound("Inventory item not found".to_string()));
        }

        info!(item_id = %item_id, "Inventory item deleted");

        if let Err(e) = self
            .event_sender
            .send(Event::InventoryItemDeleted(item_id))
            .await
        {
            warn!(error = %e, item_id = %item_id, "Failed to send inventory event");
        }

        Ok(())
    }

    /// Audit trail for one item, newest first
    #[instrument(skip(self))]
    pub async fn list_logs(&self, inventory_id: Uuid) -> Result<Vec<LogModel>, ServiceError> {
        let db = &*self.db_pool;

        LogEntity::find()
            .filter(inventory_log::Column::InventoryId.eq(inventory_id))
            .order_by_desc(inventory_log::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Lists categories alphabetically
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        let db = &*self.db_pool;

        CategoryEntity::find()
            .order_by_asc(inventory_category::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Creates a category; duplicates are a conflict
    #[instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<CategoryModel, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError("Name is required".to_string()));
        }

        let db = &*self.db_pool;

        inventory_category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::Conflict(format!("Category '{name}' already exists"))
            } else {
                ServiceError::DatabaseError(e)
            }
        })
    }
}
