//! Types for the bulk exchange job API.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Flatten per-object errors that may be plain strings or `{code?, message}` objects.
pub(crate) fn deserialize_errors<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorEntry {
        Text(String),
        Detail {
            #[serde(default)]
            code: Option<String>,
            message: String,
        },
    }

    Option::<Vec<ErrorEntry>>::deserialize(deserializer).map(|opt| {
        opt.unwrap_or_default()
            .into_iter()
            .map(|e| match e {
                ErrorEntry::Text(s) => s,
                ErrorEntry::Detail {
                    code: Some(code),
                    message,
                } => format!("{code}: {message}"),
                ErrorEntry::Detail { message, .. } => message,
            })
            .collect()
    })
}

/// Direction of a bulk job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Export,
    Import,
}

impl JobKind {
    /// Path segment of the create-job endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            JobKind::Export => "export",
            JobKind::Import => "import",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// Opaque job identifier assigned by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalized job or object status.
///
/// Raw status strings vary between deployments; they are folded into this
/// enum as soon as they are read off the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Processing,
    Completed,
    PartialCompleted,
    Failed,
    /// A status this client does not know; treated as non-terminal.
    Unrecognized(String),
}

impl JobStatus {
    /// Normalize a raw status string (case-insensitive, `-`/space equal to `_`).
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "completed" | "complete" | "succeeded" | "success" | "successful" | "done"
            | "finished" => JobStatus::Completed,
            "partial_completed" | "partially_completed" | "partial_success" | "partial"
            | "completed_with_errors" => JobStatus::PartialCompleted,
            "failed" | "failure" | "error" | "errored" => JobStatus::Failed,
            "pending" | "queued" | "created" | "submitted" | "processing" | "in_progress"
            | "running" | "started" => JobStatus::Processing,
            _ => JobStatus::Unrecognized(raw.to_string()),
        }
    }

    /// Check if the status ends polling.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::PartialCompleted | JobStatus::Failed
        )
    }

    /// Check if the status counts as success (fully or partially).
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::PartialCompleted)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::PartialCompleted => "partial_completed",
            JobStatus::Failed => "failed",
            JobStatus::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        JobStatus::parse(&raw)
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-object section of a job status response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobObjectResult {
    /// Object type name as reported by the platform.
    pub name: String,
    pub status: JobStatus,
    #[serde(default)]
    pub total_size: u64,
    #[serde(default)]
    pub file_urls: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_errors")]
    pub errors: Vec<String>,
}

/// Response body of `GET bulk/jobs/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    #[serde(default, alias = "jobId", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Absent on bare error bodies such as `{"error": "Job not found"}`.
    #[serde(default = "missing_status")]
    pub status: JobStatus,
    #[serde(default)]
    pub objects: Vec<JobObjectResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn missing_status() -> JobStatus {
    JobStatus::Unrecognized(String::new())
}

impl JobStatusResponse {
    /// Check if the body reports that the job does not exist (yet).
    pub fn is_not_found(&self) -> bool {
        self.error
            .as_deref()
            .is_some_and(|e| e.to_lowercase().contains("not found"))
            && !self.status.is_terminal()
    }
}

/// Response body of the create-job endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateJobResponse {
    #[serde(rename = "jobId", alias = "id")]
    pub job_id: String,
}

/// Client-side view of a job, refreshed by polling.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub objects: Vec<JobObjectResult>,
    pub error: Option<String>,
}

impl Job {
    pub(crate) fn from_response(id: JobId, kind: JobKind, response: JobStatusResponse) -> Self {
        Self {
            id,
            kind,
            status: response.status,
            objects: response.objects,
            error: response.error,
        }
    }
}
