//! # bulkport
//!
//! Client for bulk data exchange jobs: exports and imports submitted to a
//! remote platform, tracked to completion and reconciled into one outcome.
//!
//! ## Security
//!
//! - Access tokens are redacted in Debug output
//! - Tracing skips credential parameters
//! - Error messages redact bearer tokens and signed URL parameters
//! - Pre-authenticated result URLs are fetched without the bearer token
//!
//! ## Crates
//!
//! - **bulkport-client** - HTTP client infrastructure with retry, compression, rate limiting
//! - **bulkport-jobs** - Staging, batching, submission, polling, classification and download
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bulkport::{BulkJobClient, DownloadRequest, ExportQuery, OutputFormat, OutputTarget};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = BulkJobClient::new("https://shop.example.com", "access_token")?;
//!
//!     let report = client
//!         .execute_export(
//!             ExportQuery::new("{ products { sku title } }"),
//!             &DownloadRequest::new(OutputTarget::Directory("out".into()))
//!                 .with_format(OutputFormat::Csv),
//!         )
//!         .await?;
//!
//!     for file in &report.downloads.written {
//!         println!("{} -> {}", file.object, file.path.display());
//!     }
//!
//!     Ok(())
//! }
//! ```

// Re-export all crates for convenient access
pub use bulkport_client as client;
pub use bulkport_jobs as jobs;

// Re-export commonly used types at the top level
pub use bulkport_client::{ClientConfig, PlatformClient, RetryConfig};
pub use bulkport_jobs::{
    BulkJobClient, DownloadRequest, ExportQuery, FileFormat, ImportSource, JobConfig, JobOutcome,
    ObjectType, OutputFormat, OutputTarget,
};
