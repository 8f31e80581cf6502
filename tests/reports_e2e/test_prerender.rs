//! E2E tests: the nightly pre-render sweep and cleanup.

use std::collections::HashSet;

use chrono::{Duration, Utc};

use captable_reports_lib::services::cleanup::run_cleanup;
use captable_reports_lib::services::ordering::ORDERING_TOKENS;
use captable_reports_lib::services::storage::ArtifactStore;

use super::test_helpers::*;

#[tokio::test]
async fn test_sweep_creates_every_shape_once() {
    let fx = Fixture::new().await;

    // One shareholder only: skipped
    let solo = fx.pool.insert_company("Solo GmbH").await.unwrap();
    fx.pool
        .insert_shareholder(solo.id, "1", "Sam", "Solo", None)
        .await
        .unwrap();

    let summary = fx.prerenderer().run_sweep().await.unwrap();
    let expected = 2 * ORDERING_TOKENS.len() * 2;
    assert_eq!(summary.companies, 1);
    assert_eq!(summary.created, expected);
    assert_eq!(summary.skipped, 0);

    let requests = fx.queue.render_requests();
    assert_eq!(requests.len(), expected);
    assert!(requests.iter().all(|r| !r.notify && !r.track_downloads));

    let mut shapes = HashSet::new();
    for request in &requests {
        let report = fx
            .pool
            .get_report_by_id(request.report_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.company_id, fx.company_id);
        assert!(report.user_id.is_none());
        assert_ne!(report.report_type, "vested_shares");
        shapes.insert((report.report_type, report.order_by, report.file_type));
    }
    assert_eq!(shapes.len(), expected);

    // Everything is still pending within its ETA
    let again = fx.prerenderer().run_sweep().await.unwrap();
    assert_eq!(again.created, 0);
    assert_eq!(again.skipped, expected);
    assert!(fx.queue.take().is_empty());
}

#[tokio::test]
async fn test_sweep_renders_and_cleanup_keeps_newest() {
    let fx = Fixture::new().await;
    let renderer = fx.renderer();

    fx.prerenderer().run_sweep().await.unwrap();
    let first_batch = fx.queue.render_requests();
    for request in &first_batch {
        renderer.render(*request).await.unwrap();
    }

    // Rendered shapes are eligible again
    let summary = fx.prerenderer().run_sweep().await.unwrap();
    assert_eq!(summary.created, first_batch.len());
    let second_batch = fx.queue.render_requests();
    for request in &second_batch {
        renderer.render(*request).await.unwrap();
    }
    assert_eq!(fx.storage.keys().await.len(), first_batch.len() * 2);

    let cutoff = Utc::now() + Duration::seconds(1);
    let cleanup = run_cleanup(&fx.pool, fx.storage.as_ref(), cutoff).await.unwrap();
    assert_eq!(cleanup.deleted, first_batch.len());
    assert_eq!(cleanup.errors, 0);

    for request in &first_batch {
        assert!(fx.pool.get_report_by_id(request.report_id).await.unwrap().is_none());
    }
    for request in &second_batch {
        let report = fx
            .pool
            .get_report_by_id(request.report_id)
            .await
            .unwrap()
            .unwrap();
        let key = report.file_key.unwrap();
        assert!(fx.storage.read(&key).await.is_ok());
    }
}
