//! API endpoint modules.

pub mod health;
pub mod openapi;
pub mod reports;

use actix_web::web;

pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use reports::configure_routes as configure_report_routes;

/// Mount every route under the caller's scope (`/api/v1` in production).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_report_routes)
        .service(openapi::openapi_json);
}
