//! Reconciles Maven artifact descriptors against a project's `pom.xml`.
//!
//! A descriptor names one artifact (group, artifact, version, plus resolution
//! details). Applying it finds-or-creates the matching `dependency` element and,
//! when the project packages content with the FileVault plugin, the matching
//! `embedded` element, then writes the POM back.

pub mod batch;
pub mod descriptor;
pub mod error;
pub mod fetch;
pub mod pom;
pub mod reconcile;
pub mod report;
pub mod updater;

pub use batch::{parse_batch, process_batch, BatchEvent, BatchFailure, BatchStage};
pub use descriptor::{Action, ArtifactDescriptor, RawDescriptor, Resolution};
pub use error::{DescriptorError, DownloadError, ErrorKind, PomStructureError};
pub use pom::{Element, Node, PomDocument};
pub use reconcile::Outcome;
pub use report::{ArtifactReport, DownloadReport, ErrorReport, RunReport};
pub use updater::PomUpdater;

pub const POM_NAMESPACE: &str = "http://maven.apache.org/POM/4.0.0";
pub const FILEVAULT_PLUGIN_ARTIFACT_ID: &str = "filevault-package-maven-plugin";

pub const DEFAULT_ROOT_DIR: &str = "all";
pub const ENV_ROOT: &str = "POMSYNC_ROOT";
pub const POM_FILE_NAME: &str = "pom.xml";
pub const LIB_DIR_NAME: &str = "lib";

/// Prefix of the `systemPath` written for downloaded artifacts; resolved by Maven
/// relative to the directory holding the POM.
pub const SYSTEM_PATH_BASE: &str = "${project.basedir}/lib";

pub const REPORT_SCHEMA_VERSION: &str = "pomsync.report@0.1.0";
