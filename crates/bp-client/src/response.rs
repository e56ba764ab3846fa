//! HTTP response handling with platform error parsing.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};

/// Wrapper around an HTTP response.
#[derive(Debug)]
pub struct Response {
    inner: reqwest::Response,
}

impl Response {
    pub(crate) fn new(inner: reqwest::Response) -> Self {
        Self { inner }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Returns true if the response status is successful (2xx).
    pub fn is_success(&self) -> bool {
        self.inner.status().is_success()
    }

    /// Get a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name)?.to_str().ok()
    }

    /// Get the Retry-After header as a Duration (seconds form only).
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get the response body as text.
    pub async fn text(self) -> Result<String> {
        self.inner.text().await.map_err(Into::into)
    }

    /// Deserialize the response body as JSON.
    ///
    /// The body is read as text first so decode failures report a JSON error
    /// rather than a transport error.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let body = self.text().await?;
        serde_json::from_str(&body).map_err(Into::into)
    }
}

/// Extension trait for processing platform API responses.
pub trait ResponseExt {
    /// Turn a non-success response into the matching error.
    fn check_platform_error(self) -> impl std::future::Future<Output = Result<Response>> + Send;
}

impl ResponseExt for Response {
    async fn check_platform_error(self) -> Result<Response> {
        let status = self.status();

        if self.is_success() {
            return Ok(self);
        }

        let body = self.text().await.unwrap_or_default();
        Err(parse_error_response(status, &body))
    }
}

/// Error bodies the platform is known to return.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    /// `{"error": {"code": "...", "message": "..."}}`
    Nested { error: ErrorDetail },
    /// `{"errors": [{"message": "..."}]}`
    List { errors: Vec<ErrorDetail> },
    /// `[{"code": "...", "message": "..."}]`
    Array(Vec<ErrorDetail>),
    /// `{"error": "..."}`
    Plain { error: String },
    /// `{"code": "...", "message": "..."}`
    Flat(ErrorDetail),
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default, alias = "errorCode")]
    code: Option<String>,
    message: String,
}

impl ErrorBody {
    fn into_detail(self) -> Option<(Option<String>, String)> {
        match self {
            ErrorBody::Nested { error } | ErrorBody::Flat(error) => {
                Some((error.code, error.message))
            }
            ErrorBody::List { errors } | ErrorBody::Array(errors) => {
                let mut errors = errors.into_iter();
                let first = errors.next()?;
                let rest: Vec<String> = errors.map(|e| e.message).collect();
                let message = if rest.is_empty() {
                    first.message
                } else {
                    format!("{}; {}", first.message, rest.join("; "))
                };
                Some((first.code, message))
            }
            ErrorBody::Plain { error } => Some((None, error)),
        }
    }
}

/// Parse an error response body and convert it to the appropriate error kind.
fn parse_error_response(status: u16, body: &str) -> Error {
    if status == 429 {
        return Error::new(ErrorKind::RateLimited { retry_after: None });
    }

    if let Some((code, message)) = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_detail)
    {
        return Error::new(ErrorKind::PlatformApi {
            status,
            code,
            message: sanitize_error_message(&message),
        });
    }

    let sanitized = sanitize_error_message(body);
    let kind = match status {
        401 => ErrorKind::Authentication(sanitized),
        403 => ErrorKind::Authorization(sanitized),
        404 => ErrorKind::NotFound(sanitized),
        _ => ErrorKind::Http {
            status,
            message: sanitized,
        },
    };

    Error::new(kind)
}

static BEARER_PATTERN: LazyLock<regex_lite::Regex> = LazyLock::new(|| {
    regex_lite::Regex::new(r"(?i)bearer\s+[A-Za-z0-9._~+/=-]+").expect("bearer pattern is valid")
});

static SIGNED_PARAM_PATTERN: LazyLock<regex_lite::Regex> = LazyLock::new(|| {
    regex_lite::Regex::new(r"(?i)((?:x-amz-)?signature|sig|token|access_token)=[^&\s]+")
        .expect("signed parameter pattern is valid")
});

/// Sanitize an error message to prevent exposing sensitive data.
///
/// Bearer tokens and the signing parameters of pre-authenticated file URLs
/// are redacted, and long messages are truncated.
pub(crate) fn sanitize_error_message(message: &str) -> String {
    const MAX_LENGTH: usize = 500;

    let sanitized = BEARER_PATTERN.replace_all(message, "Bearer [REDACTED]");
    let mut sanitized = SIGNED_PARAM_PATTERN
        .replace_all(&sanitized, "$1=[REDACTED]")
        .into_owned();

    if sanitized.len() > MAX_LENGTH {
        let mut cut = MAX_LENGTH;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("...[truncated]");
    }

    sanitized
}
