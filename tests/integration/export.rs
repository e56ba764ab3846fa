use bulkport::jobs::{ErrorKind, JobStatus, ObjectClass};
use bulkport::{DownloadRequest, ExportQuery, ObjectType, OutputFormat, OutputTarget};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

const JOB_ID: &str = "exp-001";

async fn mount_submit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/bulk/export"))
        .and(header_exists("authorization"))
        .and(body_partial_json(json!({ "query": "{ products { sku } categories { key } }" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobId": JOB_ID })))
        .expect(1)
        .mount(server)
        .await;
}

fn query() -> ExportQuery {
    ExportQuery::new("{ products { sku } categories { key } }")
}

#[tokio::test]
async fn test_export_downloads_completed_objects_only() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let server = MockServer::start().await;
    mount_submit(&server).await;

    let file_url = format!("{}/files/product-1.jsonl?sig=abc", server.uri());
    common::mount_status_sequence(
        &server,
        JOB_ID,
        vec![
            json!({ "id": JOB_ID, "status": "PROCESSING" }),
            json!({
                "id": JOB_ID,
                "status": "PARTIAL_COMPLETED",
                "objects": [
                    {
                        "name": "product",
                        "status": "COMPLETED",
                        "totalSize": 2,
                        "fileUrls": [file_url]
                    },
                    {
                        "name": "category",
                        "status": "FAILED",
                        "totalSize": 0,
                        "errors": ["No Category records fetched"]
                    }
                ]
            }),
        ],
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/files/product-1.jsonl"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "{\"_meta\":{\"type\":\"product\"}}\n{\"sku\":\"A-1\"}\n{\"sku\":\"A-2\"}\n",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server, &dir);
    let report = client
        .execute_export(
            query(),
            &DownloadRequest::new(OutputTarget::Directory(out.clone())).with_format(OutputFormat::Jsonl),
        )
        .await
        .unwrap();

    let outcome = &report.outcome;
    assert_eq!(outcome.status, JobStatus::PartialCompleted);
    assert!(outcome.is_partial());
    assert_eq!(outcome.objects.len(), 2);
    assert_eq!(outcome.objects[1].class, ObjectClass::NoRecordsAvailable);
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w == "category: no records available"));

    assert_eq!(report.downloads.written.len(), 1);
    assert_eq!(report.downloads.skipped, vec!["category".to_string()]);

    let written = &report.downloads.written[0];
    assert_eq!(written.path, out.join(format!("product-{JOB_ID}.jsonl")));
    assert_eq!(written.record_count, 2);
    let contents = std::fs::read_to_string(&written.path).unwrap();
    assert_eq!(contents, "{\"sku\":\"A-1\"}\n{\"sku\":\"A-2\"}\n");

    // The result URL is pre-signed and must not see the bearer token.
    let requests = server.received_requests().await.unwrap();
    let download = requests
        .iter()
        .find(|r| r.url.path() == "/files/product-1.jsonl")
        .expect("download request");
    assert!(!download.headers.contains_key("authorization"));

    assert!(!out.join(format!("category-{JOB_ID}.jsonl")).exists());
}

#[tokio::test]
async fn test_export_with_all_objects_failing_is_business_failure() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_submit(&server).await;
    common::mount_status_sequence(
        &server,
        JOB_ID,
        vec![json!({
            "id": JOB_ID,
            "status": "FAILED",
            "objects": [
                { "name": "product", "status": "FAILED", "errors": ["query timed out"] },
                {
                    "name": "category",
                    "status": "FAILED",
                    "errors": [{ "code": "FORBIDDEN", "message": "missing scope" }]
                }
            ]
        })],
    )
    .await;

    let client = common::client(&server, &dir);
    let err = client
        .execute_export(
            query(),
            &DownloadRequest::new(OutputTarget::Directory(dir.path().join("out")))
                .with_object_type(ObjectType::Product),
        )
        .await
        .unwrap_err();

    match &err.kind {
        ErrorKind::BusinessFailure { job_id, failures } => {
            assert_eq!(job_id, JOB_ID);
            let names: Vec<&str> = failures.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(names, ["product", "category"]);
            assert_eq!(failures[1].errors, vec!["FORBIDDEN: missing scope".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!dir.path().join("out").exists());
}

#[tokio::test]
async fn test_export_submit_rejected_by_platform() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/bulk/export"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "UNAUTHORIZED",
            "message": "token expired"
        })))
        .mount(&server)
        .await;

    let client = common::client(&server, &dir);
    let err = client
        .execute_export(
            query(),
            &DownloadRequest::new(OutputTarget::Directory(dir.path().to_path_buf())),
        )
        .await
        .unwrap_err();

    assert!(matches!(err.kind, ErrorKind::Api { status: 401, .. }));
    assert!(!err.is_transient());
}
