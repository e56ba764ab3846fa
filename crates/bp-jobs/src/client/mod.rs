//! Bulk job client.
//!
//! Provides the end-to-end import and export workflows on top of the
//! submit, poll, classify and download building blocks.

mod status;
mod submit;

pub use submit::{ExportQuery, JobPayload};

use std::path::PathBuf;
use tracing::{info, instrument, warn};

use bulkport_client::{ClientConfig, PlatformClient};

use crate::batcher::{ImportSource, MultiObjectBatcher, SkippedFile};
use crate::classifier::{JobOutcome, ResultClassifier};
use crate::config::JobConfig;
use crate::downloader::{DownloadReport, DownloadRequest, Downloader};
use crate::error::Result;
use crate::object_type::{validate_registry, ObjectType};
use crate::stager::FileStager;

/// Result of an import run.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub outcome: JobOutcome,
    /// Input files left out of the batch.
    pub skipped: Vec<SkippedFile>,
    /// Staged files kept on disk (verbose runs).
    pub retained_files: Vec<PathBuf>,
}

/// Result of an export run.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub outcome: JobOutcome,
    pub downloads: DownloadReport,
}

/// Bulk exchange job client.
///
/// # Example
///
/// ```rust,ignore
/// use bulkport_jobs::{BulkJobClient, ImportSource};
///
/// let client = BulkJobClient::new("https://shop.example.com", "access_token")?;
/// let report = client
///     .execute_import(&[ImportSource::new("product-2024.json")])
///     .await?;
///
/// for warning in &report.outcome.warnings {
///     eprintln!("warning: {warning}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BulkJobClient {
    client: PlatformClient,
    config: JobConfig,
    classifier: ResultClassifier,
}

impl BulkJobClient {
    /// Create a new client with default HTTP and job configuration.
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let client = PlatformClient::new(base_url, access_token)?;
        Self::from_client(client, JobConfig::default())
    }

    /// Create a new client with custom configuration.
    pub fn with_config(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        client_config: ClientConfig,
        job_config: JobConfig,
    ) -> Result<Self> {
        let client = PlatformClient::with_config(base_url, access_token, client_config)?;
        Self::from_client(client, job_config)
    }

    /// Create a client from an existing PlatformClient.
    ///
    /// Fails if the object-type registry is inconsistent.
    pub fn from_client(client: PlatformClient, config: JobConfig) -> Result<Self> {
        validate_registry()?;
        Ok(Self {
            client,
            config,
            classifier: ResultClassifier::new(),
        })
    }

    /// Get the underlying PlatformClient.
    pub fn inner(&self) -> &PlatformClient {
        &self.client
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Submit a payload, wait for the job and classify the result.
    #[instrument(skip(self, payload), fields(kind = %payload.kind()))]
    pub async fn run_job(
        &self,
        payload: &JobPayload,
        requested: &[ObjectType],
    ) -> Result<JobOutcome> {
        let job_id = self.submit(payload).await?;
        let job = self.wait_for_job(&job_id, payload.kind()).await?;
        self.classifier.classify(job, requested)
    }

    /// Stage, batch, submit and track an import.
    ///
    /// Staged files are removed after success unless `verbose` is set, and
    /// kept for inspection when the run fails.
    #[instrument(skip(self, sources), fields(files = sources.len()))]
    pub async fn execute_import(&self, sources: &[ImportSource]) -> Result<ImportReport> {
        let batcher = MultiObjectBatcher::new(FileStager::new(&self.config.staging_dir));
        let batch = batcher.compose(sources)?;
        let requested = batch.request.object_types();
        let staged: Vec<PathBuf> = batch.request.files().map(|f| f.path.clone()).collect();

        let payload = JobPayload::Import(batch.request.clone());
        let outcome = match self.run_job(&payload, &requested).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(files = ?staged, "Import failed, staged files retained");
                return Err(e);
            }
        };

        batch.request.cleanup(self.config.verbose)?;
        let retained_files = if self.config.verbose { staged } else { Vec::new() };

        info!(
            job_id = %outcome.job_id,
            records = outcome.record_count(),
            warnings = outcome.warnings.len(),
            "Import finished"
        );

        Ok(ImportReport {
            outcome,
            skipped: batch.skipped,
            retained_files,
        })
    }

    /// Run an export and download its result files.
    #[instrument(skip(self, query, download))]
    pub async fn execute_export(
        &self,
        query: ExportQuery,
        download: &DownloadRequest,
    ) -> Result<ExportReport> {
        let requested: Vec<ObjectType> = download.object_type.into_iter().collect();
        let outcome = self
            .run_job(&JobPayload::Export(query), &requested)
            .await?;

        let downloads = Downloader::new(self.client.clone())
            .download(&outcome, download)
            .await?;

        info!(
            job_id = %outcome.job_id,
            files = downloads.written.len(),
            warnings = outcome.warnings.len(),
            "Export finished"
        );

        Ok(ExportReport { outcome, downloads })
    }
}
