use std::sync::atomic::Ordering;

use bulkport::jobs::{ErrorKind, JobStatus};
use bulkport::ImportSource;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

const JOB_ID: &str = "imp-001";

fn write_products(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("product-1.json");
    let records = json!([
        { "sku": "A-1", "title": "Kettle" },
        { "sku": "A-2", "title": "Teapot" },
        { "sku": "A-3", "title": "Mug" }
    ]);
    std::fs::write(&path, records.to_string()).unwrap();
    path
}

async fn mount_submit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/bulk/import"))
        .and(header("authorization", format!("Bearer {}", common::TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobId": JOB_ID })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_import_succeeds_after_polling() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_submit(&server).await;

    let processing = json!({ "id": JOB_ID, "status": "PROCESSING", "objects": [] });
    let completed = json!({
        "id": JOB_ID,
        "status": "COMPLETED",
        "objects": [
            { "name": "product", "status": "COMPLETED", "totalSize": 3 }
        ]
    });
    let polls = common::mount_status_sequence(
        &server,
        JOB_ID,
        vec![processing.clone(), processing, completed],
    )
    .await;

    let client = common::client(&server, &dir);
    let source = write_products(&dir);
    let report = client
        .execute_import(&[ImportSource::new(&source)])
        .await
        .unwrap();

    assert_eq!(report.outcome.job_id.as_str(), JOB_ID);
    assert_eq!(report.outcome.status, JobStatus::Completed);
    assert_eq!(report.outcome.objects.len(), 1);
    assert_eq!(report.outcome.record_count(), 3);
    assert!(report.outcome.warnings.is_empty());
    assert!(report.skipped.is_empty());
    assert!(report.retained_files.is_empty());
    assert_eq!(polls.load(Ordering::SeqCst), 3);

    // Staged wire files are removed after a successful run.
    assert_eq!(common::staged_files(&dir), 0);
}

#[tokio::test]
async fn test_import_uploads_wire_file() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_submit(&server).await;
    common::mount_status_sequence(
        &server,
        JOB_ID,
        vec![json!({
            "id": JOB_ID,
            "status": "COMPLETED",
            "objects": [{ "name": "product", "status": "COMPLETED", "totalSize": 3 }]
        })],
    )
    .await;

    let client = common::client(&server, &dir);
    let source = write_products(&dir);
    client
        .execute_import(&[ImportSource::new(&source)])
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let upload = requests
        .iter()
        .find(|r| r.url.path() == "/api/v1/bulk/import")
        .expect("import request");
    let body = String::from_utf8_lossy(&upload.body);

    assert!(body.contains("name=\"products\""));
    assert!(body.contains(r#"{"metadata":{"objectType":"product"}}"#));
    assert!(body.contains(r#""sku":"A-3""#));
}

#[tokio::test]
async fn test_failed_import_retains_staged_files() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_submit(&server).await;
    common::mount_status_sequence(
        &server,
        JOB_ID,
        vec![json!({
            "id": JOB_ID,
            "status": "FAILED",
            "objects": [{
                "name": "product",
                "status": "FAILED",
                "errors": [{ "code": "INVALID", "message": "sku is required" }]
            }]
        })],
    )
    .await;

    let client = common::client(&server, &dir);
    let source = write_products(&dir);
    let err = client
        .execute_import(&[ImportSource::new(&source)])
        .await
        .unwrap_err();

    match &err.kind {
        ErrorKind::BusinessFailure { job_id, failures } => {
            assert_eq!(job_id, JOB_ID);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].name, "product");
            assert_eq!(failures[0].errors, vec!["INVALID: sku is required".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("sku is required"));
    assert_eq!(common::staged_files(&dir), 1);
}

#[tokio::test]
async fn test_import_rejects_empty_input_before_submitting() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/bulk/import"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobId": JOB_ID })))
        .expect(0)
        .mount(&server)
        .await;

    let source = dir.path().join("product-empty.json");
    std::fs::write(&source, "[]").unwrap();

    let client = common::client(&server, &dir);
    let err = client
        .execute_import(&[ImportSource::new(&source)])
        .await
        .unwrap_err();

    assert!(err.is_validation());
}
