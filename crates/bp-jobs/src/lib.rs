//! # bulkport-jobs
//!
//! Bulk export/import job lifecycle for the bulk exchange API.
//!
//! ## Features
//!
//! - **Staging** - JSON arrays, CSV and JSON-Lines converted to the line-delimited wire format
//! - **Batching** - Several object types combined into one multipart import
//! - **Polling** - Tolerant status state machine with a hard timeout ceiling
//! - **Classification** - Per-object success, no-records and failure reconciled into one outcome
//! - **Download** - Chunked result files merged and written with collision-safe names
//!
//! ## Example - Export
//!
//! ```rust,ignore
//! use bulkport_jobs::{BulkJobClient, DownloadRequest, ExportQuery, OutputTarget};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bulkport_jobs::Error> {
//!     let client = BulkJobClient::new("https://shop.example.com", "access_token")?;
//!
//!     let report = client
//!         .execute_export(
//!             ExportQuery::new("{ products { sku title } }"),
//!             &DownloadRequest::new(OutputTarget::Directory("out".into())),
//!         )
//!         .await?;
//!
//!     println!("Wrote {} files", report.downloads.written.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Example - Import
//!
//! ```rust,ignore
//! use bulkport_jobs::{BulkJobClient, ImportSource, ObjectType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bulkport_jobs::Error> {
//!     let client = BulkJobClient::new("https://shop.example.com", "access_token")?;
//!
//!     let report = client
//!         .execute_import(&[
//!             ImportSource::new("product-1.json"),
//!             ImportSource::new("stock.csv").with_object_type(ObjectType::Inventory),
//!         ])
//!         .await?;
//!
//!     println!("Imported {} records", report.outcome.record_count());
//!
//!     Ok(())
//! }
//! ```

mod batcher;
mod classifier;
mod client;
mod config;
mod downloader;
mod error;
mod object_type;
mod poller;
mod stager;
mod types;
pub mod wire;

pub use batcher::{
    type_from_file_name, Batch, BatchRequest, ImportSource, MultiObjectBatcher, SkippedFile,
    WIRE_CONTENT_TYPE,
};
pub use classifier::{JobOutcome, ObjectClass, ObjectOutcome, ResultClassifier};
pub use client::{BulkJobClient, ExportQuery, ExportReport, ImportReport, JobPayload};
pub use config::{
    JobConfig, JobConfigBuilder, DEFAULT_NOT_FOUND_RETRY_DELAY, DEFAULT_POLL_INTERVAL,
    DEFAULT_TIMEOUT, MAX_TIMEOUT,
};
pub use downloader::{
    DownloadReport, DownloadRequest, Downloader, OutputFormat, OutputTarget, WrittenFile,
};
pub use error::{Error, ErrorKind, ObjectFailure, Result};
pub use object_type::{validate_registry, ObjectType};
pub use poller::{
    step, JobPoller, JobStatusSource, Observation, PollPhase, PollState, Scheduler, Step,
    TokioScheduler,
};
pub use stager::{render, FileFormat, FileStager, SourceFormat, StagedFile};
pub use types::*;
