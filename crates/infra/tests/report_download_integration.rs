//! Create, poll and download a report end to end

mod support;

use std::time::Duration;

use serde_json::json;
use spapi_domain::{DownloadOptions, ReportRequest, SpApiError};
use support::{error_response, json_response, TestEnv};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

const REPORTS: &str = "/reports/2021-06-30/reports";

fn create_body() -> serde_json::Value {
    json!({
        "reportType": "GET_FLAT_FILE_OPEN_LISTINGS_DATA",
        "marketplaceIds": ["A1PA6795UKMFR9"]
    })
}

async fn mount_create(env: &TestEnv) {
    Mock::given(method("POST"))
        .and(path(REPORTS))
        .and(body_json(create_body()))
        .respond_with(json_response(202, json!({ "reportId": "ID323" })))
        .expect(1)
        .mount(&env.api)
        .await;
}

async fn mount_status(env: &TestEnv, status: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("{REPORTS}/ID323")))
        .respond_with(json_response(
            200,
            json!({
                "reportId": "ID323",
                "reportType": "GET_FLAT_FILE_OPEN_LISTINGS_DATA",
                "processingStatus": status,
                "reportDocumentId": if status == "DONE" { json!("DOC-323") } else { json!(null) }
            }),
        ))
        .up_to_n_times(times)
        .mount(&env.api)
        .await;
}

#[tokio::test]
async fn report_is_polled_until_done_and_downloaded() {
    let env = TestEnv::start().await;
    env.mount_refresh_token("Atza|reports").await;
    mount_create(&env).await;
    mount_status(&env, "IN_QUEUE", 1).await;
    mount_status(&env, "IN_PROGRESS", 1).await;
    mount_status(&env, "DONE", 1).await;
    Mock::given(method("GET"))
        .and(path("/reports/2021-06-30/documents/DOC-323"))
        .respond_with(json_response(
            200,
            json!({
                "reportDocumentId": "DOC-323",
                "url": format!("{}/storage/DOC-323", env.api.uri())
            }),
        ))
        .expect(1)
        .mount(&env.api)
        .await;
    Mock::given(method("GET"))
        .and(path("/storage/DOC-323"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("sku\tasin\nSKU-1\tB000TEST01\n", "text/plain;charset=UTF-8"),
        )
        .expect(1)
        .mount(&env.api)
        .await;

    let request = ReportRequest::new(create_body())
        .interval(Duration::from_millis(250))
        .download(DownloadOptions::default().json(true));
    let content = env.client().download_report(&request).await.expect("report");

    assert_eq!(content.as_json(), Some(&json!([{ "sku": "SKU-1", "asin": "B000TEST01" }])));
    assert_eq!(env.sleeper.sleeps(), vec![Duration::from_millis(250), Duration::from_millis(250)]);
    assert_eq!(env.token_requests().await, 1);
}

#[tokio::test]
async fn report_is_cancelled_after_the_allowed_tries() {
    let env = TestEnv::start().await;
    env.mount_refresh_token("Atza|reports").await;
    mount_create(&env).await;
    mount_status(&env, "IN_PROGRESS", 10).await;
    Mock::given(method("DELETE"))
        .and(path(format!("{REPORTS}/ID323")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&env.api)
        .await;

    let request = ReportRequest::new(create_body())
        .interval(Duration::from_millis(100))
        .cancel_after(2);
    let err = env.client().download_report(&request).await.expect_err("cancelled");

    assert_eq!(err, SpApiError::ReportProcessingCancelledManually { tries: 2, interval_ms: 100 });
    assert_eq!(env.sleeper.count(), 1);
}

#[tokio::test]
async fn fatal_report_is_reported_with_its_status() {
    let env = TestEnv::start().await;
    env.mount_refresh_token("Atza|reports").await;
    mount_create(&env).await;
    mount_status(&env, "FATAL", 1).await;

    let err = env
        .client()
        .download_report(&ReportRequest::new(create_body()))
        .await
        .expect_err("fatal");

    assert_eq!(err.code(), "REPORT_PROCESSING_FATAL");
    assert_eq!(env.sleeper.count(), 0);
}

#[tokio::test]
async fn create_failure_is_not_retried() {
    let env = TestEnv::start().await;
    env.mount_refresh_token("Atza|reports").await;
    Mock::given(method("POST"))
        .and(path(REPORTS))
        .respond_with(error_response(400, "InvalidInput", "Invalid reportType"))
        .expect(1)
        .mount(&env.api)
        .await;

    let err = env
        .client()
        .download_report(&ReportRequest::new(json!({ "reportType": "NOPE" })))
        .await
        .expect_err("invalid input");

    assert_eq!(err.code(), "INVALID_INPUT");
}

#[tokio::test]
async fn streamed_report_yields_the_document_bytes() {
    let env = TestEnv::start().await;
    env.mount_refresh_token("Atza|reports").await;
    mount_create(&env).await;
    mount_status(&env, "DONE", 1).await;
    Mock::given(method("GET"))
        .and(path("/reports/2021-06-30/documents/DOC-323"))
        .respond_with(json_response(
            200,
            json!({ "reportDocumentId": "DOC-323", "url": format!("{}/storage/stream", env.api.uri()) }),
        ))
        .mount(&env.api)
        .await;
    Mock::given(method("GET"))
        .and(path("/storage/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string("sku\nSKU-1\n"))
        .mount(&env.api)
        .await;

    let stream = env
        .client()
        .download_report_stream(&ReportRequest::new(create_body()))
        .await
        .expect("stream");

    assert_eq!(stream.collect().await.unwrap(), b"sku\nSKU-1\n");
}
