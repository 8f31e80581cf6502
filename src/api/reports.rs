//! Report API handlers.

use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, web};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::require_operator;
use crate::config::ReportSettings;
use crate::db::DbPool;
use crate::entity::report;
use crate::error::{AppError, AppResult};
use crate::models::{
    AuthenticatedUser, CachedReportQuery, CreateReportRequest, FileType, ReportResponse,
    ReportShape,
};
use crate::services::ordering::OrderSpec;
use crate::services::queue::{Job, JobQueue};
use crate::services::render::RenderRequest;
use crate::services::render::registry;
use crate::services::reports::{ReportRequest, create_report as create_report_row};
use crate::services::storage::ArtifactStore;

async fn find_report(pool: &DbPool, report_id: Uuid) -> AppResult<report::Model> {
    pool.get_report_by_id(report_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {}", report_id)))
}

async fn ensure_company(pool: &DbPool, company_id: Uuid) -> AppResult<()> {
    pool.get_company(company_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Company {}", company_id)))
}

/// Request a report.
///
/// The report is rendered in the background; the response carries its ETA.
/// The requesting user is notified by mail once it is ready.
#[utoipa::path(
    post,
    path = "/companies/{company_id}/reports",
    tag = "Reports",
    params(
        ("company_id" = Uuid, Path, description = "Company UUID")
    ),
    request_body = CreateReportRequest,
    responses(
        (status = 202, description = "Report queued", body = ReportResponse),
        (status = 400, description = "Unknown ordering or unsupported format", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ErrorResponse),
        (status = 403, description = "Not an operator of the company", body = crate::error::ErrorResponse),
        (status = 404, description = "Company not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn create_report(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    queue: web::Data<dyn JobQueue>,
    settings: web::Data<ReportSettings>,
    path: web::Path<Uuid>,
    body: web::Json<CreateReportRequest>,
) -> AppResult<HttpResponse> {
    let company_id = path.into_inner();
    let body = body.into_inner();

    ensure_company(&pool, company_id).await?;
    require_operator(&pool, &user, company_id).await?;

    if !registry::is_supported(body.report_type, body.file_type) {
        return Err(AppError::InvalidInput(format!(
            "{} reports are not available as {}",
            body.report_type,
            body.file_type.as_str()
        )));
    }

    let report = create_report_row(
        &pool,
        &settings,
        ReportRequest {
            company_id,
            report_type: body.report_type,
            file_type: body.file_type,
            order_by: body.order_by,
            user_id: Some(user.id),
            report_at: body.report_at,
        },
    )
    .await?;

    queue.enqueue(Job::Render(RenderRequest {
        report_id: report.id,
        notify: true,
        track_downloads: true,
    }))?;

    info!(
        report_id = %report.id,
        user_id = %user.id,
        "Report requested"
    );

    Ok(HttpResponse::Accepted().json(ReportResponse::from(report)))
}

/// Get a report's status.
#[utoipa::path(
    get,
    path = "/reports/{report_id}",
    tag = "Reports",
    params(
        ("report_id" = Uuid, Path, description = "Report UUID")
    ),
    responses(
        (status = 200, description = "Report status", body = ReportResponse),
        (status = 403, description = "Not an operator of the company", body = crate::error::ErrorResponse),
        (status = 404, description = "Report not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn get_report(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let report = find_report(&pool, path.into_inner()).await?;
    require_operator(&pool, &user, report.company_id).await?;

    Ok(HttpResponse::Ok().json(ReportResponse::from(report)))
}

/// Newest generated report of a shape, usually one built by the nightly sweep.
#[utoipa::path(
    get,
    path = "/companies/{company_id}/reports/cached",
    tag = "Reports",
    params(
        ("company_id" = Uuid, Path, description = "Company UUID"),
        ("report_type" = String, Query, description = "captable, assembly_participation or vested_shares"),
        ("file_type" = String, Query, description = "PDF or XLS"),
        ("order_by" = String, Query, description = "Ordering token")
    ),
    responses(
        (status = 200, description = "Cached report", body = ReportResponse),
        (status = 400, description = "Unknown ordering", body = crate::error::ErrorResponse),
        (status = 403, description = "Not an operator of the company", body = crate::error::ErrorResponse),
        (status = 404, description = "No generated report of this shape", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn get_cached_report(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    query: web::Query<CachedReportQuery>,
) -> AppResult<HttpResponse> {
    let company_id = path.into_inner();
    let query = query.into_inner();

    ensure_company(&pool, company_id).await?;
    require_operator(&pool, &user, company_id).await?;
    OrderSpec::parse(&query.order_by)?;

    let shape = ReportShape::new(company_id, query.report_type, query.order_by, query.file_type);
    let report = pool
        .latest_generated_for_shape(&shape)
        .await?
        .ok_or_else(|| AppError::NotFound("Cached report".to_string()))?;

    debug!(report_id = %report.id, "Serving cached report");
    Ok(HttpResponse::Ok().json(ReportResponse::from(report)))
}

/// Download a generated report.
///
/// The first download stamps `downloaded_at`.
#[utoipa::path(
    get,
    path = "/reports/{report_id}/download",
    tag = "Reports",
    params(
        ("report_id" = Uuid, Path, description = "Report UUID")
    ),
    responses(
        (status = 200, description = "Report file"),
        (status = 403, description = "Not an operator of the company", body = crate::error::ErrorResponse),
        (status = 404, description = "Report not found or not generated yet", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn download_report(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    storage: web::Data<dyn ArtifactStore>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let report = find_report(&pool, path.into_inner()).await?;
    require_operator(&pool, &user, report.company_id).await?;

    let (file_key, file_name) = match (&report.generated_at, report.file_key, report.file_name) {
        (Some(_), Some(key), Some(name)) => (key, name),
        _ => {
            return Err(AppError::NotFound(format!(
                "Generated file for report {}",
                report.id
            )));
        }
    };
    let file_type = FileType::parse(&report.file_type).ok_or_else(|| {
        AppError::InvalidInput(format!("Report {} has unknown file type", report.id))
    })?;

    let bytes = storage.read(&file_key).await?;

    if pool.mark_first_download(report.id, Utc::now()).await? {
        info!(report_id = %report.id, user_id = %user.id, "First download");
    }

    Ok(HttpResponse::Ok()
        .content_type(file_type.content_type())
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file_name)],
        })
        .body(bytes))
}

/// Configure report routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/companies/{company_id}/reports").route(web::post().to(create_report)),
    )
    .service(
        web::resource("/companies/{company_id}/reports/cached")
            .route(web::get().to(get_cached_report)),
    )
    .service(web::resource("/reports/{report_id}").route(web::get().to(get_report)))
    .service(web::resource("/reports/{report_id}/download").route(web::get().to(download_report)));
}
