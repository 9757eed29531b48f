use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::entities::{
    inventory_category::Model as CategoryModel, inventory_item::Model as ItemModel,
    inventory_log::Model as LogModel,
};
use crate::handlers::common::{validate_input, PaginationParams};
use crate::services::inventory::{CreateInventoryItemRequest, UpdateInventoryItemRequest};
use crate::{errors::ServiceError, ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInventoryItemBody {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    pub low_stock_threshold: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInventoryItemBody {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
    pub low_stock_threshold: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryBody {
    pub name: String,
}

/// List stock items alphabetically (admin)
#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(PaginationParams),
    responses(
        (status = 200, description = "Inventory list returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<ItemModel>>>, ServiceError> {
    let (page, per_page) = pagination.normalized();
    let result = state.services.inventory.list_items(page, per_page).await?;

    let total_pages = result.total.div_ceil(per_page);
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: result.items,
        total: result.total,
        page: result.page,
        limit: result.per_page,
        total_pages,
    })))
}

/// Create a stock item; the initial quantity is logged as an IN movement
/// (admin)
#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = CreateInventoryItemBody,
    responses(
        (status = 201, description = "Inventory item created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn create_inventory_item(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<CreateInventoryItemBody>,
) -> Result<(StatusCode, Json<ApiResponse<ItemModel>>), ServiceError> {
    validate_input(&body)?;

    let item = state
        .services
        .inventory
        .create_item(
            CreateInventoryItemRequest {
                name: body.name,
                brand: body.brand,
                category: body.category,
                quantity: body.quantity,
                unit_price: body.unit_price,
                low_stock_threshold: body.low_stock_threshold,
            },
            &admin.email,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(item))))
}

/// Items at or below their low-stock threshold (admin)
pub async fn low_stock_items(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<Vec<ItemModel>>>, ServiceError> {
    let items = state.services.inventory.low_stock_items().await?;
    Ok(Json(ApiResponse::success(items)))
}

/// Update a stock item; quantity changes are audited (admin)
pub async fn update_inventory_item(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateInventoryItemBody>,
) -> Result<Json<ApiResponse<ItemModel>>, ServiceError> {
    let item = state
        .services
        .inventory
        .update_item(
            id,
            UpdateInventoryItemRequest {
                name: body.name,
                brand: body.brand,
                category: body.category,
                quantity: body.quantity,
                unit_price: body.unit_price,
                low_stock_threshold: body.low_stock_threshold,
            },
            &admin.email,
        )
        .await?;

    Ok(Json(ApiResponse::success(item)))
}

/// Delete a stock item (admin)
pub async fn delete_inventory_item(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    state.services.inventory.delete_item(id).await?;

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted_id": id }),
    )))
}

/// Audit trail for one stock item, newest first (admin)
pub async fn list_inventory_logs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<LogModel>>>, ServiceError> {
    let logs = state.services.inventory.list_logs(id).await?;
    Ok(Json(ApiResponse::success(logs)))
}

/// List inventory categories (admin)
pub async fn list_categories(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<Vec<CategoryModel>>>, ServiceError> {
    let categories = state.services.inventory.list_categories().await?;
    Ok(Json(ApiResponse::success(categories)))
}

/// Create an inventory category (admin)
pub async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CreateCategoryBody>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryModel>>), ServiceError> {
    let category = state.services.inventory.create_category(&body.name).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(category))))
}
