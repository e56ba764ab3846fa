use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bulkport::{BulkJobClient, ClientConfig, JobConfig};
use serde_json::Value;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const TOKEN: &str = "integration-token";

/// Client with fast polling and staging under `dir`.
pub fn client(server: &MockServer, dir: &TempDir) -> BulkJobClient {
    let client_config = ClientConfig::builder().without_retry().build();
    let job_config = JobConfig::builder()
        .with_poll_interval(Duration::from_millis(20))
        .with_not_found_retry_delay(Duration::from_millis(10))
        .with_timeout(Duration::from_secs(10))
        .with_staging_dir(dir.path().join("staging"))
        .build();

    BulkJobClient::with_config(server.uri(), TOKEN, client_config, job_config)
        .expect("client should build")
}

/// Serve `bodies` for successive status polls; the last one repeats.
pub async fn mount_status_sequence(
    server: &MockServer,
    job_id: &str,
    bodies: Vec<Value>,
) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/bulk/jobs/{job_id}")))
        .respond_with(move |_: &Request| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let body = bodies[n.min(bodies.len() - 1)].clone();
            ResponseTemplate::new(200).set_body_json(body)
        })
        .mount(server)
        .await;

    calls
}

/// Count the staged files left in the staging directory.
pub fn staged_files(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path().join("staging"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}
