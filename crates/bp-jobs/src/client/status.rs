//! Job status queries.

use tracing::instrument;

use super::BulkJobClient;
use crate::error::Result;
use crate::poller::{JobPoller, JobStatusSource};
use crate::types::{Job, JobId, JobKind, JobStatusResponse};

impl BulkJobClient {
    /// Fetch the current status of a job once.
    #[instrument(skip(self))]
    pub async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse> {
        let url = self
            .client
            .bulk_url(&format!("jobs/{}", urlencoding::encode(job_id)));
        let status: JobStatusResponse = self.client.get_json(&url).await?;
        Ok(status)
    }

    /// Poll a job until it reaches a terminal state.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn wait_for_job(&self, job_id: &JobId, kind: JobKind) -> Result<Job> {
        JobPoller::new(self.config.clone())
            .wait(self, job_id, kind)
            .await
    }
}

impl JobStatusSource for BulkJobClient {
    async fn fetch_status(&self, job_id: &JobId) -> Result<JobStatusResponse> {
        self.job_status(job_id.as_str()).await
    }
}
