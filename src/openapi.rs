use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Autoworx API",
        version = "1.0.0",
        description = r#"
# Autoworx Repair Shop API

Backend for the Autoworx repair shop: appointment booking and tracking,
estimate numbering, inventory control with a movement audit trail, parts
assignment, archival of completed jobs, and AI-assisted chat and reporting.

## Authentication

Admin endpoints require a bearer session token whose email claim is on the
configured admin allow-list:

```
Authorization: Bearer <session-token>
```

Booking, tracking, uploads, feedback, and chat are public.

## Error Handling

Errors use a consistent response format with appropriate HTTP status codes:

```json
{
  "error": "Not Found",
  "message": "Appointment not found",
  "request_id": "req-abc123",
  "timestamp": "2026-08-07T00:00:00Z"
}
```
        "#,
        contact(
            name = "Autoworx Cagayan",
            email = "autoworxcagayan2025@gmail.com"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "appointments", description = "Booking, tracking, and appointment administration"),
        (name = "history", description = "Archival and the historical record store"),
        (name = "inventory", description = "Stock items, categories, and the movement audit trail"),
        (name = "parts", description = "Part line items attached to appointments"),
        (name = "feedback", description = "Customer feedback"),
        (name = "uploads", description = "Damage and ORCR image uploads"),
        (name = "reports", description = "AI-generated business reports"),
    ),
    paths(
        crate::handlers::appointments::book_appointment,
        crate::handlers::appointments::track_appointment,
        crate::handlers::appointments::list_appointments,
        crate::handlers::appointments::generate_estimate,
        crate::handlers::history::archive_appointment,
        crate::handlers::inventory::list_inventory,
        crate::handlers::inventory::create_inventory_item,
        crate::handlers::parts::create_part,
        crate::handlers::feedback::submit_feedback,
        crate::handlers::uploads::upload_images,
        crate::handlers::reports::monthly_report,
    ),
    components(
        schemas(
            crate::handlers::appointments::BookAppointmentRequest,
            crate::handlers::appointments::UpdateAppointmentBody,
            crate::handlers::appointments::EstimateResponse,
            crate::handlers::history::ArchiveRequest,
            crate::handlers::inventory::CreateInventoryItemBody,
            crate::handlers::inventory::UpdateInventoryItemBody,
            crate::handlers::parts::CreatePartBody,
            crate::handlers::feedback::SubmitFeedbackBody,
            crate::handlers::uploads::UploadResponse,
            crate::handlers::reports::MonthlyReportRequest,
            crate::errors::ErrorResponse,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Autoworx API"));
        assert!(json.contains("/api/v1/appointments"));
    }
}
