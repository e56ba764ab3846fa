//! Line-delimited wire format.
//!
//! Line 1 is a single-line JSON metadata object, lines 2..N are one compact
//! JSON record each. Import files carry `{"metadata":{"objectType":"<type>"}}`,
//! export results carry `{"_meta":{"type":"<Type>", ...}}`.

use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::object_type::ObjectType;

/// What the first line of a wire file declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metadata {
    /// Import metadata with the declared object type name.
    Import(String),
    /// Export metadata; the type name may be missing.
    Export(Option<String>),
}

/// Build the import metadata line for a type (no trailing newline).
pub fn import_metadata_line(object_type: ObjectType) -> String {
    json!({ "metadata": { "objectType": object_type.api_name() } }).to_string()
}

/// Split text into its first line and everything after the first `\n`.
///
/// The remainder is returned byte for byte.
pub fn split_first_line(text: &str) -> (&str, &str) {
    match text.find('\n') {
        Some(idx) => (&text[..idx], &text[idx + 1..]),
        None => (text, ""),
    }
}

/// Inspect a line for a metadata object.
pub fn parse_metadata(line: &str) -> Option<Metadata> {
    let line = line.trim_start_matches('\u{feff}').trim();
    if !line.starts_with('{') {
        return None;
    }
    let value: Value = serde_json::from_str(line).ok()?;
    let object = value.as_object()?;

    if let Some(meta) = object.get("metadata").and_then(Value::as_object) {
        let name = meta.get("objectType").and_then(Value::as_str)?;
        return Some(Metadata::Import(name.to_string()));
    }

    if let Some(meta) = object.get("_meta").and_then(Value::as_object) {
        let name = meta.get("type").and_then(Value::as_str).map(str::to_string);
        return Some(Metadata::Export(name));
    }

    None
}

/// Rewrite an export-produced file into import shape.
///
/// Only line 1 is replaced; every following byte is preserved.
pub fn adapt_export(text: &str, fallback: Option<ObjectType>) -> Result<(ObjectType, String)> {
    let (first, rest) = split_first_line(text);
    let declared = match parse_metadata(first) {
        Some(Metadata::Export(name)) => name,
        _ => return Err(Error::validation("input does not start with export metadata")),
    };

    let object_type = match declared.as_deref() {
        Some(name) => ObjectType::from_name(name)
            .ok_or_else(|| Error::validation(format!("unknown object type '{name}' in export metadata")))?,
        None => fallback.ok_or_else(|| {
            Error::validation("export metadata has no type and none was given")
        })?,
    };

    let mut adapted = import_metadata_line(object_type);
    if text.len() > first.len() {
        adapted.push('\n');
        adapted.push_str(rest);
    }
    Ok((object_type, adapted))
}

/// Encode records into wire text for an object type.
pub fn encode(object_type: ObjectType, records: &[Map<String, Value>]) -> String {
    let mut out = import_metadata_line(object_type);
    for record in records {
        out.push('\n');
        // A map of JSON values always serializes.
        out.push_str(&Value::Object(record.clone()).to_string());
    }
    out
}

/// Decode the records of a wire (or plain JSON-Lines) text.
///
/// A leading metadata line is skipped, blank lines are ignored.
pub fn decode_records(text: &str) -> Result<Vec<Map<String, Value>>> {
    let mut records = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || (index == 0 && parse_metadata(trimmed).is_some()) {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed)? {
            Value::Object(map) => records.push(map),
            other => {
                return Err(Error::validation(format!(
                    "line {} is not a JSON object: {}",
                    index + 1,
                    truncate(&other.to_string())
                )))
            }
        }
    }
    Ok(records)
}

fn truncate(s: &str) -> String {
    const MAX: usize = 80;
    match s.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
