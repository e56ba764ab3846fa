//! Grouping of per-type staged files into one combined import.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use bulkport_client::MultipartField;

use crate::error::{Error, Result};
use crate::object_type::ObjectType;
use crate::stager::{FileFormat, FileStager, StagedFile};

/// Content type of every upload part.
pub const WIRE_CONTENT_TYPE: &str = "application/x-ndjson";

/// One caller-supplied import file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSource {
    pub path: PathBuf,
    /// Explicit type; otherwise inferred from the file name prefix.
    pub object_type: Option<ObjectType>,
    pub format: Option<FileFormat>,
}

impl ImportSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            object_type: None,
            format: None,
        }
    }

    pub fn with_object_type(mut self, object_type: ObjectType) -> Self {
        self.object_type = Some(object_type);
        self
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// A file left out of the batch, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Staged files keyed by object type, ready for submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchRequest {
    files: BTreeMap<ObjectType, StagedFile>,
}

impl BatchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a staged file. Returns the file back if its type is already present.
    pub fn insert(&mut self, staged: StagedFile) -> std::result::Result<(), StagedFile> {
        if self.files.contains_key(&staged.object_type) {
            return Err(staged);
        }
        self.files.insert(staged.object_type, staged);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, object_type: ObjectType) -> Option<&StagedFile> {
        self.files.get(&object_type)
    }

    /// Object types in the batch, in registry order.
    pub fn object_types(&self) -> Vec<ObjectType> {
        self.files.keys().copied().collect()
    }

    pub fn files(&self) -> impl Iterator<Item = &StagedFile> {
        self.files.values()
    }

    /// Build one multipart part per object type.
    pub fn to_multipart(&self) -> Result<Vec<MultipartField>> {
        self.files
            .values()
            .map(|staged| -> Result<MultipartField> {
                let content = std::fs::read(&staged.path)?;
                Ok(MultipartField::file(
                    staged.object_type.upload_field(),
                    staged.file_name(),
                    WIRE_CONTENT_TYPE,
                    content,
                ))
            })
            .collect()
    }

    /// Remove every staged file unless retained.
    pub fn cleanup(&self, retain: bool) -> Result<()> {
        for staged in self.files.values() {
            staged.cleanup(retain)?;
        }
        Ok(())
    }
}

/// Outcome of composing a batch.
#[derive(Debug)]
pub struct Batch {
    pub request: BatchRequest,
    pub skipped: Vec<SkippedFile>,
}

/// Builds a `BatchRequest` from caller files.
#[derive(Debug, Clone)]
pub struct MultiObjectBatcher {
    stager: FileStager,
}

impl MultiObjectBatcher {
    pub fn new(stager: FileStager) -> Self {
        Self { stager }
    }

    /// Stage every usable source and group the results by type.
    pub fn compose(&self, sources: &[ImportSource]) -> Result<Batch> {
        let mut request = BatchRequest::new();
        let mut skipped = Vec::new();

        for source in sources {
            let object_type = match source.object_type.or_else(|| type_from_file_name(&source.path)) {
                Some(object_type) => object_type,
                None => {
                    let reason = "cannot determine object type from file name".to_string();
                    warn!(path = %source.path.display(), "{reason}, skipping");
                    skipped.push(SkippedFile {
                        path: source.path.clone(),
                        reason,
                    });
                    continue;
                }
            };

            if request.get(object_type).is_some() {
                let reason = format!("duplicate file for object type '{object_type}'");
                warn!(path = %source.path.display(), "{reason}, skipping");
                skipped.push(SkippedFile {
                    path: source.path.clone(),
                    reason,
                });
                continue;
            }

            let staged = match self.stager.stage(&source.path, object_type, source.format) {
                Ok(staged) => staged,
                Err(e) => {
                    request.cleanup(false)?;
                    return Err(e);
                }
            };

            // Export inputs may declare a different type in their metadata.
            if let Err(staged) = request.insert(staged) {
                let reason = format!("duplicate file for object type '{}'", staged.object_type);
                warn!(path = %source.path.display(), "{reason}, skipping");
                staged.cleanup(false)?;
                skipped.push(SkippedFile {
                    path: source.path.clone(),
                    reason,
                });
            }
        }

        if request.is_empty() {
            return Err(Error::validation("no importable files in batch"));
        }

        info!(
            object_types = ?request.object_types(),
            skipped = skipped.len(),
            "Composed import batch"
        );

        Ok(Batch { request, skipped })
    }
}

/// Object type from a `<objecttype>-<jobid>.<ext>` file name.
pub fn type_from_file_name(path: &Path) -> Option<ObjectType> {
    let stem = path.file_stem()?.to_str()?;
    let prefix = stem.split('-').next()?;
    ObjectType::from_name(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn batcher(dir: &TempDir) -> MultiObjectBatcher {
        MultiObjectBatcher::new(FileStager::new(dir.path().join("staging")))
    }

    #[test]
    fn test_type_from_file_name() {
        assert_eq!(
            type_from_file_name(Path::new("/tmp/product-abc123.jsonl")),
            Some(ObjectType::Product)
        );
        assert_eq!(
            type_from_file_name(Path::new("pricebookentry-1.json")),
            Some(ObjectType::PriceBookEntry)
        );
        assert_eq!(type_from_file_name(Path::new("widgets-1.json")), None);
    }

    #[test]
    fn test_compose_groups_by_type_and_skips_unknown_and_duplicates() {
        let dir = TempDir::new().unwrap();
        let product = write(&dir, "product-1.json", r#"[{"sku":"A"}]"#);
        let category = write(&dir, "category-1.json", r#"[{"name":"Shoes"}]"#);
        let unknown = write(&dir, "widget-1.json", r#"[{"id":1}]"#);
        let duplicate = write(&dir, "product-2.json", r#"[{"sku":"B"}]"#);

        let batch = batcher(&dir)
            .compose(&[
                ImportSource::new(&product),
                ImportSource::new(&unknown),
                ImportSource::new(&category),
                ImportSource::new(&duplicate),
            ])
            .unwrap();

        assert_eq!(
            batch.request.object_types(),
            vec![ObjectType::Product, ObjectType::Category]
        );
        assert_eq!(batch.skipped.len(), 2);
        assert_eq!(batch.skipped[0].path, unknown);
        assert_eq!(batch.skipped[1].path, duplicate);
    }

    #[test]
    fn test_explicit_type_overrides_file_name() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "data.csv", "email\na@example.com\n");

        let batch = batcher(&dir)
            .compose(&[ImportSource::new(&path).with_object_type(ObjectType::Customer)])
            .unwrap();
        assert_eq!(batch.request.object_types(), vec![ObjectType::Customer]);
    }

    #[test]
    fn test_empty_batch_is_validation_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "widget-1.json", r#"[{"id":1}]"#);
        let err = batcher(&dir).compose(&[ImportSource::new(&path)]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_multipart_parts_use_upload_fields() {
        let dir = TempDir::new().unwrap();
        let variant = write(&dir, "variant-1.json", r#"[{"sku":"A-S"}]"#);
        let inventory = write(&dir, "inventory-1.json", r#"[{"sku":"A-S","qty":3}]"#);

        let batch = batcher(&dir)
            .compose(&[ImportSource::new(&variant), ImportSource::new(&inventory)])
            .unwrap();
        let parts = batch.request.to_multipart().unwrap();

        let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["productVariants", "inventoryLevels"]);
        assert!(parts.iter().all(|p| p.content_type == WIRE_CONTENT_TYPE));
        assert!(parts[0].file_name.starts_with("variant-"));
        assert!(String::from_utf8_lossy(&parts[0].content)
            .starts_with(r#"{"metadata":{"objectType":"variant"}}"#));
    }

    #[test]
    fn test_stage_failure_cleans_up_earlier_files() {
        let dir = TempDir::new().unwrap();
        let good = write(&dir, "product-1.json", r#"[{"sku":"A"}]"#);
        let bad = write(&dir, "category-1.json", "[not json");

        let err = batcher(&dir)
            .compose(&[ImportSource::new(&good), ImportSource::new(&bad)])
            .unwrap_err();
        assert!(matches!(err.kind, crate::ErrorKind::File { .. }));

        let leftovers = std::fs::read_dir(dir.path().join("staging")).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
