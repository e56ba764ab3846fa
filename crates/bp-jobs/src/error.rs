//! Error types for bulkport-jobs.

use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation(message.into()))
    }

    pub(crate) fn file(path: &Path, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::File {
            path: path.to_path_buf(),
            message: message.into(),
        })
    }

    /// Returns true if the input was rejected before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self.kind, ErrorKind::Validation(_))
    }

    /// Returns true if the condition may clear up on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, ErrorKind::Transient(_))
    }

    /// Returns true if the platform reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        match &self.kind {
            ErrorKind::Api { status, .. } => *status == 404,
            ErrorKind::Client(_) => self
                .source
                .as_ref()
                .and_then(|s| s.downcast_ref::<bulkport_client::Error>())
                .is_some_and(bulkport_client::Error::is_not_found),
            _ => false,
        }
    }
}

/// Per-object failure detail carried by a business failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFailure {
    pub name: String,
    pub errors: Vec<String>,
}

fn describe_failures(failures: &[ObjectFailure]) -> String {
    failures
        .iter()
        .map(|f| {
            if f.errors.is_empty() {
                f.name.clone()
            } else {
                format!("{}: {}", f.name, f.errors.join("; "))
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("File error ({}): {message}", path.display())]
    File { path: PathBuf, message: String },
    #[error("Transient error: {0}")]
    Transient(String),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Job {job_id} failed: {}", describe_failures(failures))]
    BusinessFailure {
        job_id: String,
        failures: Vec<ObjectFailure>,
    },
    #[error("Job {job_id} did not reach a terminal state within {elapsed_secs}s")]
    Timeout { job_id: String, elapsed_secs: u64 },
    #[error("Client error: {0}")]
    Client(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("JSON error: {0}")]
    Json(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Other(String),
}

impl From<bulkport_client::Error> for Error {
    fn from(err: bulkport_client::Error) -> Self {
        use bulkport_client::ErrorKind as ClientKind;

        let kind = match &err.kind {
            ClientKind::Timeout | ClientKind::Connection(_) | ClientKind::RetriesExhausted { .. } => {
                ErrorKind::Transient(err.to_string())
            }
            ClientKind::RateLimited { .. } => ErrorKind::Transient(err.to_string()),
            ClientKind::PlatformApi {
                status, message, ..
            }
            | ClientKind::Http { status, message } => ErrorKind::Api {
                status: *status,
                message: message.clone(),
            },
            ClientKind::Authentication(message) => ErrorKind::Api {
                status: 401,
                message: message.clone(),
            },
            ClientKind::Authorization(message) => ErrorKind::Api {
                status: 403,
                message: message.clone(),
            },
            ClientKind::NotFound(message) => ErrorKind::Api {
                status: 404,
                message: message.clone(),
            },
            ClientKind::Json(message) => ErrorKind::Json(message.clone()),
            _ => ErrorKind::Client(err.to_string()),
        };

        Error {
            kind,
            source: Some(Box::new(err)),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Io(err.to_string()), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}
