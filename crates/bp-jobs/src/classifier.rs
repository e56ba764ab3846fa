//! Reconciliation of per-object results into one job outcome.

use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::error::{Error, ErrorKind, ObjectFailure, Result};
use crate::object_type::ObjectType;
use crate::types::{Job, JobId, JobKind, JobObjectResult, JobStatus};

/// Error text the platform uses when an export had nothing to return.
static NO_RECORDS_PATTERN: LazyLock<regex_lite::Regex> = LazyLock::new(|| {
    regex_lite::Regex::new(r"(?i)\bno\b.*\brecords?\b.*\bfetched\b")
        .expect("no-records pattern is valid")
});

/// Classification of one object result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    Completed,
    /// Failed only because there was nothing to fetch.
    NoRecordsAvailable,
    RealFailure,
}

/// Classified object result.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectOutcome {
    pub name: String,
    /// Registry type, when the reported name is known.
    pub object_type: Option<ObjectType>,
    pub class: ObjectClass,
    pub status: JobStatus,
    pub record_count: u64,
    pub file_urls: Vec<String>,
    pub errors: Vec<String>,
}

/// Final outcome of a successful (possibly partial) job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub objects: Vec<ObjectOutcome>,
    pub warnings: Vec<String>,
}

impl JobOutcome {
    /// True when anything short of full success was observed.
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn completed(&self) -> impl Iterator<Item = &ObjectOutcome> {
        self.objects
            .iter()
            .filter(|o| o.class == ObjectClass::Completed)
    }

    /// Total records over completed objects.
    pub fn record_count(&self) -> u64 {
        self.completed().map(|o| o.record_count).sum()
    }
}

/// Decides success, partial success or failure for a terminal job.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultClassifier;

impl ResultClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify one object result.
    pub fn classify_object(&self, object: &JobObjectResult) -> ObjectClass {
        match object.status {
            JobStatus::Completed | JobStatus::PartialCompleted => ObjectClass::Completed,
            JobStatus::Failed if object.total_size == 0 && has_no_records_error(&object.errors) => {
                ObjectClass::NoRecordsAvailable
            }
            // A non-terminal object inside a terminal job will never finish.
            _ => ObjectClass::RealFailure,
        }
    }

    /// Classify a terminal job.
    ///
    /// `requested` lists the object types the caller asked for; any missing
    /// from the response is reported as a warning.
    pub fn classify(&self, job: Job, requested: &[ObjectType]) -> Result<JobOutcome> {
        let Job {
            id,
            kind,
            status,
            objects,
            error,
        } = job;

        let mut outcomes = Vec::with_capacity(objects.len());
        let mut warnings = Vec::new();
        let mut failures = Vec::new();
        let mut seen = HashSet::new();
        let mut all_failed = true;

        for object in objects {
            let class = self.classify_object(&object);
            let object_type = ObjectType::from_name(&object.name);
            if let Some(t) = object_type {
                seen.insert(t);
            }

            match class {
                ObjectClass::Completed => {
                    all_failed = false;
                    if object.status == JobStatus::PartialCompleted {
                        warnings.push(format!(
                            "{} partially completed: {}",
                            object.name,
                            describe(&object.errors)
                        ));
                    }
                }
                ObjectClass::NoRecordsAvailable => {
                    all_failed = false;
                    warnings.push(format!("{}: no records available", object.name));
                }
                ObjectClass::RealFailure => {
                    warnings.push(format!(
                        "{} failed ({}): {}",
                        object.name,
                        object.status,
                        describe(&object.errors)
                    ));
                    failures.push(ObjectFailure {
                        name: object.name.clone(),
                        errors: object.errors.clone(),
                    });
                }
            }

            debug!(object = %object.name, ?class, "Classified object");
            outcomes.push(ObjectOutcome {
                name: object.name,
                object_type,
                class,
                status: object.status,
                record_count: object.total_size,
                file_urls: object.file_urls,
                errors: object.errors,
            });
        }

        if outcomes.is_empty() {
            if !status.is_success() {
                return Err(business_failure(
                    &id,
                    vec![ObjectFailure {
                        name: "job".to_string(),
                        errors: error.into_iter().collect(),
                    }],
                ));
            }
        } else if all_failed {
            return Err(business_failure(&id, failures));
        }

        for missing in requested.iter().filter(|t| !seen.contains(*t)) {
            warnings.push(format!("requested object type '{missing}' missing from job results"));
        }
        if let Some(error) = error {
            warnings.push(format!("job reported: {error}"));
        }

        for warning in &warnings {
            warn!(job_id = %id, "{warning}");
        }

        Ok(JobOutcome {
            job_id: id,
            kind,
            status,
            objects: outcomes,
            warnings,
        })
    }
}

fn has_no_records_error(errors: &[String]) -> bool {
    errors.iter().any(|e| NO_RECORDS_PATTERN.is_match(e))
}

fn describe(errors: &[String]) -> String {
    if errors.is_empty() {
        "no error details".to_string()
    } else {
        errors.join("; ")
    }
}

fn business_failure(job_id: &JobId, failures: Vec<ObjectFailure>) -> Error {
    Error::new(ErrorKind::BusinessFailure {
        job_id: job_id.to_string(),
        failures,
    })
}
