//! OpenAPI documentation configuration.

use actix_web::{HttpResponse, get};
use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cap-Table Report Server",
        version = "0.1.0",
        description = "Background generation and delivery of cap-table, assembly participation and vesting reports"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Report endpoints
        api::reports::create_report,
        api::reports::get_report,
        api::reports::get_cached_report,
        api::reports::download_report,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Reports
            models::FileType,
            models::ReportType,
            models::ReportStatus,
            models::CreateReportRequest,
            models::CachedReportQuery,
            models::ReportResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Reports", description = "Report requests, status and downloads")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add API key security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new(crate::config::API_KEY_HEADER),
                    ),
                ),
            );
        }
    }
}

/// Serve the OpenAPI document.
#[get("/openapi.json")]
pub async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}
