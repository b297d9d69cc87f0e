use std::path::PathBuf;

use serde::Serialize;

use crate::descriptor::ArtifactDescriptor;
use crate::error::ErrorKind;
use crate::reconcile::Outcome;
use crate::REPORT_SCHEMA_VERSION;

/// What applying one descriptor did to the POM and the library tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactReport {
    pub coordinates: String,
    pub version: String,
    pub action: String,
    pub dependency: Outcome,
    pub created_dependencies: bool,
    /// `None` when the POM has no FileVault packaging plugin.
    pub embedded: Option<Outcome>,
    pub created_embeddeds: bool,
    pub download: Option<DownloadReport>,
}

impl ArtifactReport {
    pub fn new(d: &ArtifactDescriptor, dependency: Outcome) -> Self {
        Self {
            coordinates: d.coordinates(),
            version: d.version().to_string(),
            action: d.action().as_str().to_string(),
            dependency,
            created_dependencies: false,
            embedded: None,
            created_embeddeds: false,
            download: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadReport {
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: u64,
    pub removed: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<serde_json::Value>,
}

impl ErrorReport {
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            kind: ErrorKind::of(err),
            message: format!("{err:#}"),
            index: None,
            descriptor: None,
        }
    }
}

/// Machine-readable summary of a run, printed with `--json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub schema_version: &'static str,
    pub ok: bool,
    pub pom: PathBuf,
    pub artifacts: Vec<ArtifactReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl RunReport {
    pub fn success(pom: PathBuf, artifacts: Vec<ArtifactReport>) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            ok: true,
            pom,
            artifacts,
            error: None,
        }
    }

    pub fn failure(pom: PathBuf, artifacts: Vec<ArtifactReport>, error: ErrorReport) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            ok: false,
            pom,
            artifacts,
            error: Some(error),
        }
    }
}
