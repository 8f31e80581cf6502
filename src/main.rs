//! Cap-table report server - main entry point.
//!
//! Starts the job dispatcher, the pre-render and cleanup schedulers and the
//! Actix-web server.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};
use actix_web::{App, HttpServer, web};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use captable_reports_lib::api;
use captable_reports_lib::config::{Config, StorageBackend};
use captable_reports_lib::db::DbPool;
use captable_reports_lib::middleware::RequestLogger;
use captable_reports_lib::services::directory::HolderDirectory;
use captable_reports_lib::services::notifier::{self, Notifier};
use captable_reports_lib::services::{
    ArtifactStore, CleanupConfig, JobQueue, MemoryStorage, Prerenderer, Renderer, S3Storage,
    TaskQueue, Worker, start_cleanup_task, start_prerender_task,
};

/// Log a fatal startup error and exit.
fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    error!("{}: {}", context, err);
    std::process::exit(1);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // `--health-check` is used by the container HEALTHCHECK
    if std::env::args().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if Config::from_env().is_ok() { 0 } else { 1 });
    }

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL, S3 credentials and CTR_SITE_URL must be set");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Cap-Table Report Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let pool = match DbPool::new(&config).await {
        Ok(pool) => pool,
        Err(e) => fail("Failed to initialize database", e),
    };
    info!("Database connection established");

    if let Err(e) = pool.run_migrations().await {
        fail("Failed to run migrations", e);
    }
    info!("Database migrations complete");

    let storage: Arc<dyn ArtifactStore> = match config.storage.backend {
        StorageBackend::S3 => match S3Storage::new(&config.storage).await {
            Ok(s3) => Arc::new(s3),
            Err(e) => fail("Failed to initialize S3 storage", e),
        },
        StorageBackend::Memory => {
            warn!("Artifacts are kept in memory and lost on restart");
            Arc::new(MemoryStorage::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match notifier::from_settings(&config.mail) {
        Ok(notifier) => Arc::from(notifier),
        Err(e) => fail("Failed to initialize mail notifier", e),
    };
    if config.mail.api_url.is_none() {
        info!("CTR_MAIL_API_URL not set, report notifications are only logged");
    }

    // Job queue and workers
    let settings = config.reports.clone();
    let directory: Arc<dyn HolderDirectory> = Arc::new(pool.clone());
    let (task_queue, receiver) = TaskQueue::channel();
    let queue: Arc<dyn JobQueue> = Arc::new(task_queue);

    let renderer = Arc::new(Renderer::new(
        pool.clone(),
        directory.clone(),
        storage.clone(),
        notifier,
        settings.clone(),
        config.site_url.clone(),
    ));
    let prerenderer = Arc::new(Prerenderer::new(
        pool.clone(),
        directory,
        queue.clone(),
        settings.clone(),
    ));
    receiver.spawn_dispatcher(
        Arc::new(Worker::new(renderer, prerenderer)),
        settings.render_workers,
    );

    start_prerender_task(queue.clone(), settings.prerender_interval_secs);
    start_cleanup_task(
        pool.clone(),
        storage.clone(),
        CleanupConfig {
            retention_hours: settings.retention_hours,
            interval_secs: if config.is_development() { 60 } else { 3600 },
        },
    );

    let bind_address = config.bind_address();
    let is_development = config.is_development();
    let worker_count = if is_development { 4 } else { num_cpus::get() };
    info!(
        "Starting server at http://{} ({} workers, {} render workers)",
        bind_address, worker_count, settings.render_workers
    );

    let queue_data: web::Data<dyn JobQueue> = web::Data::from(queue);
    let storage_data: web::Data<dyn ArtifactStore> = web::Data::from(storage);
    let settings_data = web::Data::new(settings);
    let pool_data = web::Data::new(pool);

    HttpServer::new(move || {
        let cors = if is_development {
            // Permissive CORS for development
            Cors::default()
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
        } else {
            // Same-origin only in production
            Cors::default()
        }
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-api-key"),
        ])
        .max_age(3600);

        App::new()
            // CORS must be before other middleware
            .wrap(cors)
            .wrap(RequestLogger)
            .app_data(pool_data.clone())
            .app_data(queue_data.clone())
            .app_data(storage_data.clone())
            .app_data(settings_data.clone())
            .service(web::scope("/api/v1").configure(api::configure_routes))
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run()
    .await
}
