//! Conversion between external file formats and the wire format.

use serde_json::{Map, Value};
use std::fmt;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, instrument};

use crate::error::{Error, ErrorKind, Result};
use crate::object_type::ObjectType;
use crate::wire::{self, Metadata};

/// External record formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// A JSON array of objects.
    Json,
    /// CSV with a header row.
    Csv,
    /// One JSON object per line.
    Jsonl,
}

impl FileFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(FileFormat::Json),
            "csv" => Some(FileFormat::Csv),
            "jsonl" | "ndjson" => Some(FileFormat::Jsonl),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Json => "json",
            FileFormat::Csv => "csv",
            FileFormat::Jsonl => "jsonl",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(FileFormat::Json),
            "csv" => Ok(FileFormat::Csv),
            "jsonl" | "ndjson" => Ok(FileFormat::Jsonl),
            other => Err(Error::validation(format!("unknown file format '{other}'"))),
        }
    }
}

/// How a staged file was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Csv,
    Jsonl,
    /// Already in import wire format; passed through.
    Wire,
    /// Export result re-staged for import.
    Export,
}

impl From<FileFormat> for SourceFormat {
    fn from(format: FileFormat) -> Self {
        match format {
            FileFormat::Json => SourceFormat::Json,
            FileFormat::Csv => SourceFormat::Csv,
            FileFormat::Jsonl => SourceFormat::Jsonl,
        }
    }
}

/// A wire-format file ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub object_type: ObjectType,
    pub source_format: SourceFormat,
    pub record_count: usize,
}

impl StagedFile {
    /// File name reported in the multipart upload.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.jsonl", self.object_type))
    }

    /// Remove the staged file unless it should be retained.
    pub fn cleanup(&self, retain: bool) -> Result<()> {
        if retain {
            debug!(path = %self.path.display(), "Retaining staged file");
            return Ok(());
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Converts caller files into staged wire files.
#[derive(Debug, Clone)]
pub struct FileStager {
    staging_dir: PathBuf,
}

impl FileStager {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Stage one input file as `object_type`.
    ///
    /// The format is taken from `format` or inferred from the extension.
    /// Inputs already in wire format pass through; export results have their
    /// metadata line rewritten and take their type from it.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn stage(
        &self,
        path: &Path,
        object_type: ObjectType,
        format: Option<FileFormat>,
    ) -> Result<StagedFile> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::with_source(file_kind(path, e.to_string()), e))?;

        let format = match format.or_else(|| FileFormat::from_path(path)) {
            Some(format) => format,
            None => sniff_format(&text),
        };

        if format != FileFormat::Csv {
            let (first, _) = wire::split_first_line(&text);
            match wire::parse_metadata(first) {
                Some(Metadata::Import(declared)) => {
                    return self.pass_through(path, &text, object_type, &declared)
                }
                Some(Metadata::Export(_)) => {
                    let (object_type, adapted) = wire::adapt_export(&text, Some(object_type))?;
                    let record_count = count_records(&adapted);
                    if record_count == 0 {
                        return Err(no_records(path));
                    }
                    return self.write(&adapted, object_type, SourceFormat::Export, record_count);
                }
                None => {}
            }
        }

        let records = match format {
            FileFormat::Json => parse_json_array(path, &text)?,
            FileFormat::Csv => parse_csv(path, &text)?,
            FileFormat::Jsonl => wire::decode_records(&text).map_err(|e| to_file_error(path, e))?,
        };

        if records.is_empty() {
            return Err(no_records(path));
        }

        let encoded = wire::encode(object_type, &records);
        self.write(&encoded, object_type, format.into(), records.len())
    }

    fn pass_through(
        &self,
        path: &Path,
        text: &str,
        object_type: ObjectType,
        declared: &str,
    ) -> Result<StagedFile> {
        if ObjectType::from_name(declared) != Some(object_type) {
            return Err(Error::validation(format!(
                "{} declares object type '{declared}' but '{object_type}' was requested",
                path.display()
            )));
        }
        let record_count = count_records(text);
        if record_count == 0 {
            return Err(no_records(path));
        }
        self.write(text, object_type, SourceFormat::Wire, record_count)
    }

    fn write(
        &self,
        contents: &str,
        object_type: ObjectType,
        source_format: SourceFormat,
        record_count: usize,
    ) -> Result<StagedFile> {
        std::fs::create_dir_all(&self.staging_dir)?;
        let path = self
            .staging_dir
            .join(format!("{}-{}.jsonl", object_type, uuid::Uuid::new_v4()));
        std::fs::write(&path, contents)?;

        debug!(
            path = %path.display(),
            %object_type,
            record_count,
            "Staged file"
        );

        Ok(StagedFile {
            path,
            object_type,
            source_format,
            record_count,
        })
    }
}

/// Render records in an external format (export direction).
pub fn render(records: &[Map<String, Value>], format: FileFormat) -> Result<String> {
    match format {
        FileFormat::Json => {
            let mut out = serde_json::to_string_pretty(records)?;
            out.push('\n');
            Ok(out)
        }
        FileFormat::Jsonl => {
            let mut out = String::new();
            for record in records {
                out.push_str(&serde_json::to_string(record)?);
                out.push('\n');
            }
            Ok(out)
        }
        FileFormat::Csv => render_csv(records),
    }
}

fn render_csv(records: &[Map<String, Value>]) -> Result<String> {
    let mut header: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !header.contains(&key.as_str()) {
                header.push(key);
            }
        }
    }
    if header.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&header).map_err(csv_error)?;
    for record in records {
        let row = header.iter().map(|key| match record.get(*key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        });
        writer.write_record(row).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::new(ErrorKind::Io(e.to_string())))?;
    String::from_utf8(bytes).map_err(|e| Error::with_source(ErrorKind::Other(e.to_string()), e))
}

fn parse_json_array(path: &Path, text: &str) -> Result<Vec<Map<String, Value>>> {
    let value: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
        .map_err(|e| Error::with_source(file_kind(path, e.to_string()), e))?;
    let Value::Array(items) = value else {
        return Err(Error::file(path, "expected a JSON array of objects"));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(Error::validation(format!(
                "{}: element {index} is not a JSON object",
                path.display()
            ))),
        })
        .collect()
}

fn parse_csv(path: &Path, text: &str) -> Result<Vec<Map<String, Value>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::with_source(file_kind(path, e.to_string()), e))?
        .clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| Error::with_source(file_kind(path, e.to_string()), e))?;
        let record = headers
            .iter()
            .zip(row.iter())
            .map(|(key, cell)| (key.to_string(), Value::String(cell.to_string())))
            .collect();
        records.push(record);
    }
    Ok(records)
}

/// Guess between a JSON array and JSON-Lines when there is no extension.
fn sniff_format(text: &str) -> FileFormat {
    if text.trim_start_matches('\u{feff}').trim_start().starts_with('[') {
        FileFormat::Json
    } else {
        FileFormat::Jsonl
    }
}

/// Records in a wire text: non-blank lines after the metadata line.
fn count_records(text: &str) -> usize {
    let (_, rest) = wire::split_first_line(text);
    rest.lines().filter(|l| !l.trim().is_empty()).count()
}

fn file_kind(path: &Path, message: String) -> ErrorKind {
    ErrorKind::File {
        path: path.to_path_buf(),
        message,
    }
}

fn to_file_error(path: &Path, err: Error) -> Error {
    match err.kind {
        ErrorKind::Json(message) => Error {
            kind: file_kind(path, message),
            source: err.source,
        },
        _ => err,
    }
}

fn no_records(path: &Path) -> Error {
    Error::validation(format!("{} contains no records", path.display()))
}

fn csv_error(err: csv::Error) -> Error {
    Error::with_source(ErrorKind::Other(format!("CSV error: {err}")), err)
}
