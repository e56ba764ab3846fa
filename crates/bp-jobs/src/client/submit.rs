//! Job creation.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use super::BulkJobClient;
use crate::batcher::BatchRequest;
use crate::error::{Error, ErrorKind, Result};
use crate::types::{CreateJobResponse, JobId, JobKind};

/// An export query with its variables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportQuery {
    pub query: String,
    pub variables: Value,
}

impl ExportQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Value::Null,
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }
}

/// What a job is created from; the variant decides the job kind.
#[derive(Debug, Clone)]
pub enum JobPayload {
    Export(ExportQuery),
    Import(BatchRequest),
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::Export(_) => JobKind::Export,
            JobPayload::Import(_) => JobKind::Import,
        }
    }

    /// Reject payloads that cannot form a valid job.
    pub fn validate(&self) -> Result<()> {
        match self {
            JobPayload::Export(query) => {
                if query.query.trim().is_empty() {
                    return Err(Error::validation("export query is empty"));
                }
                if !matches!(query.variables, Value::Object(_) | Value::Null) {
                    return Err(Error::validation("export variables must be a JSON object"));
                }
            }
            JobPayload::Import(batch) => {
                if batch.is_empty() {
                    return Err(Error::validation("import batch is empty"));
                }
                if let Some(missing) = batch.files().find(|f| !f.path.is_file()) {
                    return Err(Error::validation(format!(
                        "staged file {} is missing",
                        missing.path.display()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl BulkJobClient {
    /// Create a job and return its identifier.
    #[instrument(skip(self, payload), fields(kind = %payload.kind()))]
    pub async fn submit(&self, payload: &JobPayload) -> Result<JobId> {
        payload.validate()?;

        let url = self.client.bulk_url(payload.kind().endpoint());
        let created: CreateJobResponse = match payload {
            JobPayload::Export(query) => self.client.post_json(&url, query).await?,
            JobPayload::Import(batch) => {
                let parts = batch.to_multipart()?;
                self.client.post_multipart(&url, parts).await?
            }
        };

        if created.job_id.trim().is_empty() {
            return Err(Error::new(ErrorKind::Other(
                "platform returned an empty job id".to_string(),
            )));
        }

        let job_id = JobId::new(created.job_id);
        info!(job_id = %job_id, "Job submitted");
        Ok(job_id)
    }
}
