use std::fmt;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::descriptor::ArtifactDescriptor;
use crate::report::ArtifactReport;
use crate::updater::PomUpdater;

/// Parses the artifacts document; anything but a JSON array is rejected.
pub fn parse_batch(json: &str) -> Result<Vec<Value>> {
    let doc: Value = serde_json::from_str(json).context("parse artifacts JSON")?;
    match doc {
        Value::Array(items) => Ok(items),
        other => bail!(
            "artifacts JSON must be an array of descriptor objects, got {}",
            json_kind(&other)
        ),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    Validation,
    Update,
}

#[derive(Debug)]
pub enum BatchEvent<'a> {
    Processing {
        index: usize,
        descriptor: &'a Value,
    },
    Applied {
        index: usize,
        descriptor: &'a Value,
        report: &'a ArtifactReport,
    },
}

/// First failing item of a batch. Items before it stay applied.
#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub stage: BatchStage,
    pub descriptor: Value,
    pub error: anyhow::Error,
    pub completed: Vec<ArtifactReport>,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            BatchStage::Validation => write!(
                f,
                "artifact {} failed validation: {:#}",
                self.index + 1,
                self.error
            ),
            BatchStage::Update => write!(
                f,
                "failed to update POM for artifact {}: {:#}",
                self.index + 1,
                self.error
            ),
        }
    }
}

impl std::error::Error for BatchFailure {}

/// Validates and applies each descriptor in order, stopping at the first failure.
pub fn process_batch(
    items: Vec<Value>,
    updater: &PomUpdater,
    mut on_event: impl FnMut(BatchEvent<'_>),
) -> Result<Vec<ArtifactReport>, BatchFailure> {
    let mut completed = Vec::with_capacity(items.len());
    for (index, descriptor) in items.into_iter().enumerate() {
        on_event(BatchEvent::Processing {
            index,
            descriptor: &descriptor,
        });

        let artifact = match ArtifactDescriptor::from_json(&descriptor) {
            Ok(artifact) => artifact,
            Err(err) => {
                return Err(BatchFailure {
                    index,
                    stage: BatchStage::Validation,
                    descriptor,
                    error: err.into(),
                    completed,
                })
            }
        };

        match updater.apply(&artifact) {
            Ok(report) => {
                on_event(BatchEvent::Applied {
                    index,
                    descriptor: &descriptor,
                    report: &report,
                });
                completed.push(report);
            }
            Err(error) => {
                return Err(BatchFailure {
                    index,
                    stage: BatchStage::Update,
                    descriptor,
                    error,
                    completed,
                })
            }
        }
    }
    Ok(completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pom::PomDocument;

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
    <modelVersion>4.0.0</modelVersion>
</project>
"#;

    fn dependency_versions(pom: &std::path::Path) -> Vec<(String, String)> {
        let doc = PomDocument::load(pom).expect("load");
        let Some(deps) = doc.root().find("dependencies") else {
            return Vec::new();
        };
        deps.indexed_children("dependency")
            .map(|(_, d)| {
                (
                    d.child_text("artifactId").unwrap_or_default(),
                    d.child_text("version").unwrap_or_default(),
                )
            })
            .collect()
    }

    #[test]
    fn parse_batch_requires_array() {
        assert_eq!(parse_batch("[]").expect("empty").len(), 0);
        let err = parse_batch(r#"{"groupId":"x"}"#).unwrap_err();
        assert!(err.to_string().contains("got an object"), "{err}");
        assert!(parse_batch("[").is_err());
    }

    #[test]
    fn applies_items_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("pom.xml"), POM).expect("write pom");
        let updater = PomUpdater::from_root(dir.path());

        let items = parse_batch(
            r#"[
                {"groupId": "com.acme", "artifactId": "widget", "version": "1.0"},
                {"groupId": "com.acme", "artifactId": "gadget", "version": "3.2"},
                {"groupId": "com.acme", "artifactId": "widget", "version": "1.1"}
            ]"#,
        )
        .expect("parse");

        let mut seen = Vec::new();
        let reports = process_batch(items, &updater, |event| {
            if let BatchEvent::Applied { index, .. } = event {
                seen.push(index);
            }
        })
        .expect("batch");

        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(reports.len(), 3);
        assert_eq!(
            dependency_versions(updater.pom_path()),
            vec![
                ("widget".to_string(), "1.1".to_string()),
                ("gadget".to_string(), "3.2".to_string()),
            ]
        );
    }

    #[test]
    fn stops_at_first_invalid_item_keeping_earlier_writes() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("pom.xml"), POM).expect("write pom");
        let updater = PomUpdater::from_root(dir.path());

        let items = parse_batch(
            r#"[
                {"groupId": "com.acme", "artifactId": "widget", "version": "1.0"},
                {"groupId": "com.acme", "version": "2.0"},
                {"groupId": "com.acme", "artifactId": "gadget", "version": "3.0"}
            ]"#,
        )
        .expect("parse");

        let mut processed = 0;
        let failure = process_batch(items, &updater, |event| {
            if let BatchEvent::Processing { .. } = event {
                processed += 1;
            }
        })
        .unwrap_err();

        assert_eq!(processed, 2);
        assert_eq!(failure.index, 1);
        assert_eq!(failure.stage, BatchStage::Validation);
        assert_eq!(ErrorKind::of(&failure.error), ErrorKind::MissingField);
        assert_eq!(failure.descriptor["version"], "2.0");
        assert_eq!(failure.completed.len(), 1);
        assert_eq!(
            dependency_versions(updater.pom_path()),
            vec![("widget".to_string(), "1.0".to_string())]
        );
    }

    #[test]
    fn update_failure_is_reported_with_stage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let updater = PomUpdater::from_root(dir.path());
        let items = parse_batch(r#"[{"groupId": "com.acme", "artifactId": "widget", "version": "1.0"}]"#)
            .expect("parse");
        let failure = process_batch(items, &updater, |_| {}).unwrap_err();
        assert_eq!(failure.stage, BatchStage::Update);
        assert_eq!(ErrorKind::of(&failure.error), ErrorKind::Processing);
        assert!(failure.to_string().starts_with("failed to update POM for artifact 1: read POM"));
    }
}
