//! Result file download for completed export objects.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, instrument, warn};

use bulkport_client::PlatformClient;

use crate::classifier::{JobOutcome, ObjectClass, ObjectOutcome};
use crate::error::{Error, Result};
use crate::object_type::ObjectType;
use crate::stager::{self, FileFormat};
use crate::wire;

/// Format of written result files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Raw wire text, metadata line included.
    #[default]
    Wire,
    Json,
    Csv,
    Jsonl,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Wire | OutputFormat::Jsonl => "jsonl",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Wire => f.write_str("wire"),
            other => f.write_str(other.extension()),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wire" | "raw" => Ok(OutputFormat::Wire),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "jsonl" | "ndjson" => Ok(OutputFormat::Jsonl),
            other => Err(Error::validation(format!("unknown output format '{other}'"))),
        }
    }
}

/// Where result files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Directory(PathBuf),
    /// A single file; falls back to its parent directory when several
    /// objects are written.
    File(PathBuf),
}

impl OutputTarget {
    fn directory(&self) -> PathBuf {
        match self {
            OutputTarget::Directory(dir) => dir.clone(),
            OutputTarget::File(path) => path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

/// What to download from an export outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Only this type; all completed objects when `None`.
    pub object_type: Option<ObjectType>,
    pub output: OutputTarget,
    pub format: OutputFormat,
}

impl DownloadRequest {
    pub fn new(output: OutputTarget) -> Self {
        Self {
            object_type: None,
            output,
            format: OutputFormat::default(),
        }
    }

    pub fn with_object_type(mut self, object_type: ObjectType) -> Self {
        self.object_type = Some(object_type);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

/// A file written by the downloader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub object: String,
    pub path: PathBuf,
    pub record_count: usize,
}

/// Objects written and objects left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub written: Vec<WrittenFile>,
    pub skipped: Vec<String>,
}

/// Fetches result files and writes them locally.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: PlatformClient,
}

impl Downloader {
    pub fn new(client: PlatformClient) -> Self {
        Self { client }
    }

    /// Download every matching completed object of an outcome.
    #[instrument(skip(self, outcome, request), fields(job_id = %outcome.job_id))]
    pub async fn download(
        &self,
        outcome: &JobOutcome,
        request: &DownloadRequest,
    ) -> Result<DownloadReport> {
        let mut report = DownloadReport::default();
        let mut selected = Vec::new();

        for object in outcome.objects.iter().filter(|o| matches_type(o, request.object_type)) {
            match object.class {
                ObjectClass::Completed if !object.file_urls.is_empty() => selected.push(object),
                ObjectClass::Completed => {
                    info!(object = %object.name, "Object completed without result files");
                    report.skipped.push(object.name.clone());
                }
                ObjectClass::NoRecordsAvailable => {
                    info!(object = %object.name, "No records available, nothing to download");
                    report.skipped.push(object.name.clone());
                }
                ObjectClass::RealFailure => {
                    warn!(
                        object = %object.name,
                        errors = %object.errors.join("; "),
                        "Object failed, not downloading"
                    );
                    report.skipped.push(object.name.clone());
                }
            }
        }

        let paths = plan_paths(&selected, outcome.job_id.as_str(), request);
        for (object, path) in selected.into_iter().zip(paths) {
            let text = self.fetch(object).await?;
            let (contents, record_count) = convert(&text, request.format)?;

            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, contents).await?;

            info!(object = %object.name, path = %path.display(), record_count, "Wrote result file");
            report.written.push(WrittenFile {
                object: object.name.clone(),
                path,
                record_count,
            });
        }

        Ok(report)
    }

    /// Fetch and concatenate every chunk of an object.
    ///
    /// The first non-empty chunk keeps its metadata line; later chunks lose theirs.
    async fn fetch(&self, object: &ObjectOutcome) -> Result<String> {
        let mut combined = String::new();
        for url in &object.file_urls {
            let chunk = self.client.download_text(url).await?;
            let body = if combined.is_empty() {
                chunk.as_str()
            } else {
                strip_metadata(&chunk)
            };
            if body.is_empty() {
                continue;
            }
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(body);
        }
        Ok(combined)
    }
}

fn matches_type(object: &ObjectOutcome, wanted: Option<ObjectType>) -> bool {
    match wanted {
        None => true,
        Some(t) => object.object_type == Some(t),
    }
}

/// Drop a leading metadata line from a chunk.
fn strip_metadata(chunk: &str) -> &str {
    let (first, rest) = wire::split_first_line(chunk);
    if wire::parse_metadata(first).is_some() {
        rest
    } else {
        chunk
    }
}

fn convert(text: &str, format: OutputFormat) -> Result<(String, usize)> {
    let records = wire::decode_records(text)?;
    let contents = match format {
        OutputFormat::Wire => text.to_string(),
        OutputFormat::Json => stager::render(&records, FileFormat::Json)?,
        OutputFormat::Csv => stager::render(&records, FileFormat::Csv)?,
        OutputFormat::Jsonl => stager::render(&records, FileFormat::Jsonl)?,
    };
    Ok((contents, records.len()))
}

/// Output path per selected object, distinct across objects.
fn plan_paths(objects: &[&ObjectOutcome], job_id: &str, request: &DownloadRequest) -> Vec<PathBuf> {
    if let (OutputTarget::File(path), [_]) = (&request.output, objects) {
        return vec![path.clone()];
    }

    let dir = request.output.directory();
    let ext = request.format.extension();
    let mut used = HashSet::new();

    objects
        .iter()
        .map(|object| {
            let name = object
                .object_type
                .map(|t| t.api_name().to_string())
                .unwrap_or_else(|| file_safe(&object.name));
            let mut candidate = dir.join(format!("{name}-{job_id}.{ext}"));
            let mut n = 2;
            while !used.insert(candidate.clone()) {
                candidate = dir.join(format!("{name}-{job_id}-{n}.{ext}"));
                n += 1;
            }
            candidate
        })
        .collect()
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
