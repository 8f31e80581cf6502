//! Shared test helpers for the report E2E tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use actix_web::{App, dev::ServiceResponse, test, web};
use async_trait::async_trait;
use captable_reports_lib::api;
use captable_reports_lib::auth::hash_api_key;
use captable_reports_lib::config::ReportSettings;
use captable_reports_lib::db::DbPool;
use captable_reports_lib::db::holders::NewPosition;
use captable_reports_lib::error::AppResult;
use captable_reports_lib::services::directory::HolderDirectory;
use captable_reports_lib::services::notifier::{Notifier, NotifyError};
use captable_reports_lib::services::{
    ArtifactStore, Job, JobQueue, MemoryStorage, Prerenderer, RenderRequest, Renderer,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

/// API key of the seeded operator.
pub const OPERATOR_KEY: &str = "ctr_operator_test_key";
/// API key of a user who operates no company.
pub const OUTSIDER_KEY: &str = "ctr_outsider_test_key";
pub const SITE_URL: &str = "https://shares.example.com";

/// Queue double that keeps every job instead of running it.
#[derive(Default)]
pub struct RecordingQueue {
    jobs: Mutex<Vec<Job>>,
}

impl RecordingQueue {
    pub fn take(&self) -> Vec<Job> {
        std::mem::take(&mut *self.jobs.lock().unwrap())
    }

    pub fn render_requests(&self) -> Vec<RenderRequest> {
        self.take()
            .into_iter()
            .filter_map(|job| match job {
                Job::Render(request) => Some(request),
                Job::Prerender => None,
            })
            .collect()
    }
}

impl JobQueue for RecordingQueue {
    fn enqueue(&self, job: Job) -> AppResult<()> {
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

/// A notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone)]
pub struct SentMail {
    pub recipient: String,
    pub template_id: String,
    pub variables: BTreeMap<String, String>,
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        recipient: &str,
        template_id: &str,
        variables: &BTreeMap<String, String>,
    ) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(SentMail {
            recipient: recipient.to_string(),
            template_id: template_id.to_string(),
            variables: variables.clone(),
        });
        Ok(())
    }
}

/// Everything a test needs, wired the way `main` wires production.
pub struct Fixture {
    pub pool: DbPool,
    pub storage: Arc<MemoryStorage>,
    pub queue: Arc<RecordingQueue>,
    pub notifier: Arc<RecordingNotifier>,
    pub settings: ReportSettings,
    /// Seeded company with two shareholders and a tracked security.
    pub company_id: Uuid,
    pub operator_id: Uuid,
}

impl Fixture {
    pub async fn new() -> Self {
        let pool = DbPool::in_memory()
            .await
            .expect("Failed to create in-memory database");

        let company_id = seed_company(&pool, "Müller & Söhne AG").await;

        let operator = pool
            .insert_user("operator@example.com", Some("de"), &hash_api_key(OPERATOR_KEY))
            .await
            .unwrap();
        pool.add_operator(operator.id, company_id).await.unwrap();
        pool.insert_user("outsider@example.com", None, &hash_api_key(OUTSIDER_KEY))
            .await
            .unwrap();

        Self {
            pool,
            storage: Arc::new(MemoryStorage::new()),
            queue: Arc::new(RecordingQueue::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            settings: ReportSettings::default(),
            company_id,
            operator_id: operator.id,
        }
    }

    pub fn renderer(&self) -> Renderer {
        self.renderer_with(Arc::new(self.pool.clone()))
    }

    /// Renderer reading holders through `directory`.
    pub fn renderer_with(&self, directory: Arc<dyn HolderDirectory>) -> Renderer {
        Renderer::new(
            self.pool.clone(),
            directory,
            self.storage.clone() as Arc<dyn ArtifactStore>,
            self.notifier.clone() as Arc<dyn Notifier>,
            self.settings.clone(),
            SITE_URL.to_string(),
        )
    }

    pub fn prerenderer(&self) -> Prerenderer {
        Prerenderer::new(
            self.pool.clone(),
            Arc::new(self.pool.clone()) as Arc<dyn HolderDirectory>,
            self.queue.clone() as Arc<dyn JobQueue>,
            self.settings.clone(),
        )
    }

    /// Create the test app.
    pub async fn app(
        &self,
    ) -> impl actix_web::dev::Service<
        actix_http::Request,
        Response = ServiceResponse,
        Error = actix_web::Error,
    > {
        let queue: Arc<dyn JobQueue> = self.queue.clone();
        let storage: Arc<dyn ArtifactStore> = self.storage.clone();

        test::init_service(
            App::new()
                .app_data(web::Data::new(self.pool.clone()))
                .app_data(web::Data::from(queue))
                .app_data(web::Data::from(storage))
                .app_data(web::Data::new(self.settings.clone()))
                .service(web::scope("/api/v1").configure(api::configure_routes)),
        )
        .await
    }
}

/// Seed a company with a tracked `Common` security and two shareholders.
///
/// Anna Zimmer holds units 1-3 and 5, Bernd Adler holds 6-10.
pub async fn seed_company(pool: &DbPool, name: &str) -> Uuid {
    let company = pool.insert_company(name).await.unwrap();
    let common = pool
        .insert_security(company.id, "Common", 1.0, true)
        .await
        .unwrap();
    let bought_at = Utc::now() - Duration::days(30);

    let holders = [
        ("2", "Anna", "Zimmer", "anna@example.com", "1-3,5", 4),
        ("10", "Bernd", "Adler", "bernd@example.com", "6-10", 5),
    ];
    for (number, first, last, email, segments, count) in holders {
        let holder = pool
            .insert_shareholder(company.id, number, first, last, Some(email))
            .await
            .unwrap();
        pool.insert_position(NewPosition {
            company_id: company.id,
            security_id: common.id,
            buyer_id: Some(holder.id),
            seller_id: None,
            count,
            number_segments: Some(segments.to_string()),
            bought_at,
        })
        .await
        .unwrap();
    }

    company.id
}

/// Text of a worksheet inside an XLSX artifact.
pub fn worksheet_xml(bytes: &[u8], sheet: usize) -> String {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut file = archive
        .by_name(&format!("xl/worksheets/sheet{}.xml", sheet))
        .unwrap();
    let mut xml = String::new();
    file.read_to_string(&mut xml).unwrap();
    xml
}
