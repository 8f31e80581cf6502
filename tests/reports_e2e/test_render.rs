//! E2E tests: the render pipeline against the seeded register.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use captable_reports_lib::db::DbPool;
use captable_reports_lib::db::holders::NewPosition;
use captable_reports_lib::error::AppResult;
use captable_reports_lib::models::{CompanyInfo, CompanySnapshot, FileType, ReportType};
use captable_reports_lib::services::directory::HolderDirectory;
use captable_reports_lib::services::ordering::HolderField;
use captable_reports_lib::services::RenderRequest;
use captable_reports_lib::services::notifier::REPORT_READY_TEMPLATE;
use captable_reports_lib::services::reports::{ReportRequest, create_report};
use captable_reports_lib::services::storage::ArtifactStore;

use super::test_helpers::*;

/// Directory that, like PostgreSQL, sorts NULL emails after every address.
struct NullsLastDirectory(DbPool);

#[async_trait]
impl HolderDirectory for NullsLastDirectory {
    async fn snapshot(
        &self,
        company_id: Uuid,
        as_of: DateTime<Utc>,
        field_order: Option<(HolderField, bool)>,
    ) -> AppResult<Option<CompanySnapshot>> {
        let mut snapshot = self.0.snapshot(company_id, as_of, field_order).await?;
        if let Some(ref mut snapshot) = snapshot {
            snapshot.shareholders.sort_by_key(|h| h.email.is_none());
        }
        Ok(snapshot)
    }

    async fn sweep_candidates(&self, min_shareholders: u64) -> AppResult<Vec<CompanyInfo>> {
        self.0.sweep_candidates(min_shareholders).await
    }
}

async fn render_captable_xlsx(fx: &Fixture, order_by: &str) -> String {
    let report = create_report(
        &fx.pool,
        &fx.settings,
        request_for(fx, ReportType::Captable, FileType::Xls, order_by),
    )
    .await
    .unwrap();
    let outcome = fx
        .renderer()
        .render(RenderRequest {
            report_id: report.id,
            notify: false,
            track_downloads: true,
        })
        .await
        .unwrap();
    let bytes = fx.storage.read(&outcome.file_key).await.unwrap();
    worksheet_xml(&bytes, 1)
}

fn request_for(
    fx: &Fixture,
    report_type: ReportType,
    file_type: FileType,
    order_by: &str,
) -> ReportRequest {
    ReportRequest {
        company_id: fx.company_id,
        report_type,
        file_type,
        order_by: order_by.to_string(),
        user_id: Some(fx.operator_id),
        report_at: None,
    }
}

#[tokio::test]
async fn test_captable_xlsx_lists_tracked_units_and_notifies() {
    let fx = Fixture::new().await;
    let report = create_report(
        &fx.pool,
        &fx.settings,
        request_for(&fx, ReportType::Captable, FileType::Xls, "user__last_name"),
    )
    .await
    .unwrap();

    let outcome = fx
        .renderer()
        .render(RenderRequest {
            report_id: report.id,
            notify: true,
            track_downloads: true,
        })
        .await
        .unwrap();

    let bytes = fx.storage.read(&outcome.file_key).await.unwrap();
    let sheet = worksheet_xml(&bytes, 1);
    assert!(sheet.contains("Common: 1-3,5 "));
    assert!(sheet.contains("Common: 6-10 "));
    // German header for a `de` user, Adler before Zimmer
    assert!(sheet.contains("Nachname"));
    let adler = sheet.find("Adler").unwrap();
    let zimmer = sheet.find("Zimmer").unwrap();
    assert!(adler < zimmer);

    let stored = fx.pool.get_report_by_id(report.id).await.unwrap().unwrap();
    assert!(stored.generated_at.is_some());
    assert_eq!(stored.generation_time, Some(outcome.generation_time));
    assert_eq!(stored.file_key.as_deref(), Some(outcome.file_key.as_str()));
    assert!(stored.downloaded_at.is_none(), "tracked reports wait for a download");

    let sent = fx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "operator@example.com");
    assert_eq!(sent[0].template_id, REPORT_READY_TEMPLATE);
    assert_eq!(sent[0].variables["report_type"], "captable");
    assert_eq!(
        sent[0].variables["download_url"],
        format!("{}/api/v1/reports/{}/download", SITE_URL, report.id)
    );
}

#[tokio::test]
async fn test_assembly_pdf_render() {
    let fx = Fixture::new().await;
    let report = create_report(
        &fx.pool,
        &fx.settings,
        request_for(&fx, ReportType::AssemblyParticipation, FileType::Pdf, "-number"),
    )
    .await
    .unwrap();

    let outcome = fx
        .renderer()
        .render(RenderRequest {
            report_id: report.id,
            notify: false,
            track_downloads: false,
        })
        .await
        .unwrap();

    let bytes = fx.storage.read(&outcome.file_key).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert!(outcome.file_name.ends_with("_assembly_participation.pdf"));
    assert_eq!(
        fx.storage.content_type(&outcome.file_key).await.as_deref(),
        Some("application/pdf")
    );

    // Untracked renders are stamped as downloaded right away
    let stored = fx.pool.get_report_by_id(report.id).await.unwrap().unwrap();
    assert_eq!(stored.downloaded_at, stored.generated_at);
    assert!(fx.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_rendering_twice_overwrites() {
    let fx = Fixture::new().await;
    let report = create_report(
        &fx.pool,
        &fx.settings,
        request_for(&fx, ReportType::Captable, FileType::Pdf, "share_percent"),
    )
    .await
    .unwrap();
    let request = RenderRequest {
        report_id: report.id,
        notify: false,
        track_downloads: true,
    };
    let renderer = fx.renderer();

    let first = renderer.render(request).await.unwrap();
    let first_generated = fx
        .pool
        .get_report_by_id(report.id)
        .await
        .unwrap()
        .unwrap()
        .generated_at
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = renderer.render(request).await.unwrap();
    let stored = fx.pool.get_report_by_id(report.id).await.unwrap().unwrap();

    assert_eq!(first.file_key, second.file_key);
    assert_eq!(fx.storage.keys().await, vec![second.file_key.clone()]);
    assert!(stored.generated_at.unwrap() > first_generated);
}

#[tokio::test]
async fn test_vested_shares_pdf_is_unsupported() {
    let fx = Fixture::new().await;
    let report = create_report(
        &fx.pool,
        &fx.settings,
        request_for(&fx, ReportType::VestedShares, FileType::Pdf, "number"),
    )
    .await
    .unwrap();

    let err = fx
        .renderer()
        .render(RenderRequest {
            report_id: report.id,
            notify: true,
            track_downloads: true,
        })
        .await
        .unwrap_err();

    assert!(err.to_string().contains("vested_shares"));
    let stored = fx.pool.get_report_by_id(report.id).await.unwrap().unwrap();
    assert!(stored.generated_at.is_none());
    assert!(fx.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_eta_follows_last_generation_time() {
    let fx = Fixture::new().await;
    let request = request_for(&fx, ReportType::Captable, FileType::Xls, "number");

    let first = create_report(&fx.pool, &fx.settings, request.clone())
        .await
        .unwrap();
    assert_eq!(
        first.eta - first.created_at,
        Duration::seconds(fx.settings.default_eta_secs)
    );

    fx.pool
        .mark_report_generated(first.id, Utc::now(), 42)
        .await
        .unwrap();

    let second = create_report(&fx.pool, &fx.settings, request).await.unwrap();
    assert_eq!(second.eta - second.created_at, Duration::seconds(42));
}

#[tokio::test]
async fn test_stored_field_order_comes_from_the_store() {
    let fx = Fixture::new().await;
    let preferred = fx
        .pool
        .insert_security(fx.company_id, "Preferred", 10.0, false)
        .await
        .unwrap();
    let holder = fx
        .pool
        .insert_shareholder(fx.company_id, "7", "Carl", "Ohnemail", None)
        .await
        .unwrap();
    fx.pool
        .insert_position(NewPosition {
            company_id: fx.company_id,
            security_id: preferred.id,
            buyer_id: Some(holder.id),
            seller_id: None,
            count: 3,
            number_segments: None,
            bought_at: Utc::now() - Duration::days(1),
        })
        .await
        .unwrap();

    let report = create_report(
        &fx.pool,
        &fx.settings,
        request_for(&fx, ReportType::Captable, FileType::Xls, "user__email"),
    )
    .await
    .unwrap();
    let outcome = fx
        .renderer_with(Arc::new(NullsLastDirectory(fx.pool.clone())))
        .render(RenderRequest {
            report_id: report.id,
            notify: false,
            track_downloads: true,
        })
        .await
        .unwrap();

    let bytes = fx.storage.read(&outcome.file_key).await.unwrap();
    let sheet = worksheet_xml(&bytes, 1);
    let anna = sheet.find("anna@example.com").unwrap();
    let bernd = sheet.find("bernd@example.com").unwrap();
    let carl = sheet.find("Ohnemail").unwrap();
    assert!(anna < bernd && bernd < carl, "holders without email stay last");
}

#[tokio::test]
async fn test_percentages_suppressed_above_holder_limit() {
    let mut fx = Fixture::new().await;

    let sheet = render_captable_xlsx(&fx, "number").await;
    assert!(!sheet.contains(">--<"));

    fx.settings.percent_holder_limit = 1;
    let sheet = render_captable_xlsx(&fx, "number").await;
    assert!(sheet.contains(">--<"));
    assert!(sheet.contains("Prozent"));
}
