//! E2E tests: report API, operator guard and download tracking.

use actix_web::http::header;
use actix_web::test;
use serde_json::{Value, json};
use uuid::Uuid;

use super::test_helpers::*;

fn create_request(company_id: Uuid, key: Option<&str>, body: Value) -> actix_http::Request {
    let mut req = test::TestRequest::post()
        .uri(&format!("/api/v1/companies/{}/reports", company_id))
        .set_json(body);
    if let Some(key) = key {
        req = req.insert_header(("X-API-Key", key));
    }
    req.to_request()
}

fn get_request(uri: &str, key: &str) -> actix_http::Request {
    test::TestRequest::get()
        .uri(uri)
        .insert_header(("X-API-Key", key))
        .to_request()
}

fn captable_xls() -> Value {
    json!({
        "report_type": "captable",
        "file_type": "XLS",
        "order_by": "share_count_desc"
    })
}

#[actix_rt::test]
async fn test_create_report_queues_notifying_render() {
    let fx = Fixture::new().await;
    let app = fx.app().await;

    let res = test::call_service(
        &app,
        create_request(fx.company_id, Some(OPERATOR_KEY), captable_xls()),
    )
    .await;
    assert_eq!(res.status(), 202);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["report_type"], "captable");
    assert_eq!(body["file_type"], "XLS");
    assert_eq!(body["user_id"], fx.operator_id.to_string());
    assert!(body["eta"].is_string());

    let requests = fx.queue.render_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].report_id.to_string(), body["id"].as_str().unwrap());
    assert!(requests[0].notify);
    assert!(requests[0].track_downloads);
}

#[actix_rt::test]
async fn test_create_report_rejections() {
    let fx = Fixture::new().await;
    let app = fx.app().await;

    let res = test::call_service(&app, create_request(fx.company_id, None, captable_xls())).await;
    assert_eq!(res.status(), 401, "missing key");

    let res = test::call_service(
        &app,
        create_request(fx.company_id, Some("not-a-key"), captable_xls()),
    )
    .await;
    assert_eq!(res.status(), 401, "unknown key");

    let res = test::call_service(
        &app,
        create_request(fx.company_id, Some(OUTSIDER_KEY), captable_xls()),
    )
    .await;
    assert_eq!(res.status(), 403, "not an operator");

    let res = test::call_service(
        &app,
        create_request(Uuid::now_v7(), Some(OPERATOR_KEY), captable_xls()),
    )
    .await;
    assert_eq!(res.status(), 404, "unknown company");

    let res = test::call_service(
        &app,
        create_request(
            fx.company_id,
            Some(OPERATOR_KEY),
            json!({"report_type": "vested_shares", "file_type": "PDF", "order_by": "number"}),
        ),
    )
    .await;
    assert_eq!(res.status(), 400, "unsupported format");

    let res = test::call_service(
        &app,
        create_request(
            fx.company_id,
            Some(OPERATOR_KEY),
            json!({"report_type": "captable", "file_type": "PDF", "order_by": "age"}),
        ),
    )
    .await;
    assert_eq!(res.status(), 400, "unknown ordering");
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "INVALID_INPUT");

    assert!(fx.queue.take().is_empty());
}

#[actix_rt::test]
async fn test_download_lifecycle() {
    let fx = Fixture::new().await;
    let app = fx.app().await;

    let res = test::call_service(
        &app,
        create_request(fx.company_id, Some(OPERATOR_KEY), captable_xls()),
    )
    .await;
    let created: Value = test::read_body_json(res).await;
    let report_id = created["id"].as_str().unwrap().to_string();
    let download_uri = format!("/api/v1/reports/{}/download", report_id);

    // Not generated yet
    let res = test::call_service(&app, get_request(&download_uri, OPERATOR_KEY)).await;
    assert_eq!(res.status(), 404);

    let request = fx.queue.render_requests()[0];
    fx.renderer().render(request).await.unwrap();

    // Other companies' operators are turned away
    let res = test::call_service(&app, get_request(&download_uri, OUTSIDER_KEY)).await;
    assert_eq!(res.status(), 403);

    let res = test::call_service(&app, get_request(&download_uri, OPERATOR_KEY)).await;
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let disposition = res
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains(&format!("muller-sohne-ag_{}_captable.xlsx", report_id)));

    let bytes = test::read_body(res).await;
    assert!(bytes.starts_with(b"PK"));

    let report_uuid = Uuid::parse_str(&report_id).unwrap();
    let first = fx
        .pool
        .get_report_by_id(report_uuid)
        .await
        .unwrap()
        .unwrap()
        .downloaded_at
        .expect("first download stamps downloaded_at");

    let res = test::call_service(&app, get_request(&download_uri, OPERATOR_KEY)).await;
    assert_eq!(res.status(), 200);
    let second = fx
        .pool
        .get_report_by_id(report_uuid)
        .await
        .unwrap()
        .unwrap()
        .downloaded_at;
    assert_eq!(second, Some(first), "later downloads keep the first stamp");

    // Unknown report
    let res = test::call_service(
        &app,
        get_request(&format!("/api/v1/reports/{}/download", Uuid::now_v7()), OPERATOR_KEY),
    )
    .await;
    assert_eq!(res.status(), 404);
}

#[actix_rt::test]
async fn test_status_and_cached_lookup() {
    let fx = Fixture::new().await;
    let app = fx.app().await;
    let cached_uri = format!(
        "/api/v1/companies/{}/reports/cached?report_type=captable&file_type=XLS&order_by=share_count_desc",
        fx.company_id
    );

    let res = test::call_service(&app, get_request(&cached_uri, OPERATOR_KEY)).await;
    assert_eq!(res.status(), 404);

    let res = test::call_service(
        &app,
        create_request(fx.company_id, Some(OPERATOR_KEY), captable_xls()),
    )
    .await;
    let created: Value = test::read_body_json(res).await;
    let status_uri = format!("/api/v1/reports/{}", created["id"].as_str().unwrap());

    let request = fx.queue.render_requests()[0];
    fx.renderer().render(request).await.unwrap();

    let res = test::call_service(&app, get_request(&status_uri, OPERATOR_KEY)).await;
    assert_eq!(res.status(), 200);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["status"], "generated");
    assert!(body["generation_time"].is_number());
    assert!(body.get("downloaded_at").is_none());

    let res = test::call_service(&app, get_request(&cached_uri, OPERATOR_KEY)).await;
    assert_eq!(res.status(), 200);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["id"], created["id"]);

    let res = test::call_service(&app, get_request(&status_uri, OUTSIDER_KEY)).await;
    assert_eq!(res.status(), 403);
}
