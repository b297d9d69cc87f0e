use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::descriptor::{ArtifactDescriptor, Resolution};
use crate::error::PomStructureError;
use crate::fetch;
use crate::pom::{Element, PomDocument};
use crate::reconcile::{self, required_text};
use crate::report::{ArtifactReport, DownloadReport};
use crate::{FILEVAULT_PLUGIN_ARTIFACT_ID, LIB_DIR_NAME, POM_FILE_NAME};

/// Conventional order of a POM's top-level elements.
const PROJECT_CHILD_ORDER: [&str; 22] = [
    "modelVersion",
    "parent",
    "groupId",
    "artifactId",
    "version",
    "packaging",
    "name",
    "description",
    "url",
    "inceptionYear",
    "organization",
    "licenses",
    "developers",
    "contributors",
    "modules",
    "scm",
    "properties",
    "dependencyManagement",
    "dependencies",
    "repositories",
    "pluginRepositories",
    "build",
];

const PLUGIN_CHILD_ORDER: [&str; 9] = [
    "groupId",
    "artifactId",
    "version",
    "extensions",
    "executions",
    "dependencies",
    "goals",
    "inherited",
    "configuration",
];

/// Applies descriptors to one POM file, downloading artifacts into `lib_dir`.
#[derive(Debug, Clone)]
pub struct PomUpdater {
    pom_path: PathBuf,
    lib_dir: PathBuf,
}

impl PomUpdater {
    pub fn new(pom_path: PathBuf, lib_dir: PathBuf) -> Self {
        Self { pom_path, lib_dir }
    }

    /// `<root>/pom.xml` and `<root>/lib`.
    pub fn from_root(root: &Path) -> Self {
        Self::new(root.join(POM_FILE_NAME), root.join(LIB_DIR_NAME))
    }

    pub fn pom_path(&self) -> &Path {
        &self.pom_path
    }

    pub fn lib_dir(&self) -> &Path {
        &self.lib_dir
    }

    /// Opens the POM for appending without writing anything.
    pub fn check_writable(&self) -> Result<()> {
        std::fs::OpenOptions::new()
            .append(true)
            .open(&self.pom_path)
            .with_context(|| format!("open for writing: {}", self.pom_path.display()))?;
        Ok(())
    }

    /// Downloads the artifact when requested, then loads, reconciles and rewrites
    /// the POM. A failed download leaves the POM untouched.
    pub fn apply(&self, d: &ArtifactDescriptor) -> Result<ArtifactReport> {
        let download = match d.resolution() {
            Resolution::Download => {
                let url = d
                    .url()
                    .with_context(|| format!("{} has no download url", d.coordinates()))?;
                let fetched = fetch::download_artifact(url, &self.lib_dir, d)
                    .with_context(|| format!("download {}", d.coordinates()))?;
                Some(DownloadReport {
                    path: fetched.path,
                    sha256: fetched.sha256,
                    size_bytes: fetched.size_bytes,
                    removed: fetched.removed,
                })
            }
            Resolution::Default => None,
        };

        let mut doc = PomDocument::load(&self.pom_path)?;
        let mut report = apply_to_document(&mut doc, d)
            .with_context(|| {
                format!("update {} in {}", d.coordinates(), self.pom_path.display())
            })?;
        doc.save(&self.pom_path)?;

        report.download = download;
        Ok(report)
    }
}

/// In-memory half of [`PomUpdater::apply`].
pub fn apply_to_document(doc: &mut PomDocument, d: &ArtifactDescriptor) -> Result<ArtifactReport> {
    let root = doc.root_mut();

    let (dependencies, created_dependencies) =
        root.ensure_child("dependencies", &PROJECT_CHILD_ORDER);
    let outcome = reconcile::reconcile_dependency(dependencies, d)?;
    let mut report = ArtifactReport::new(d, outcome);
    report.created_dependencies = created_dependencies;

    let Some(plugins) = root.find_mut("build").and_then(|b| b.find_mut("plugins")) else {
        return Ok(report);
    };
    let Some(idx) = find_packaging_plugin(plugins)? else {
        return Ok(report);
    };
    let Some(plugin) = plugins.element_at_mut(idx) else {
        return Ok(report);
    };

    let (configuration, _) = plugin.ensure_child("configuration", &PLUGIN_CHILD_ORDER);
    let (embeddeds, created_embeddeds) = configuration.ensure_child("embeddeds", &[]);
    report.embedded = Some(reconcile::reconcile_embedded(embeddeds, d)?);
    report.created_embeddeds = created_embeddeds;
    Ok(report)
}

fn find_packaging_plugin(plugins: &Element) -> Result<Option<usize>, PomStructureError> {
    for (pos, (idx, plugin)) in plugins.indexed_children("plugin").enumerate() {
        let artifact_id = required_text(plugin, "artifactId", || {
            format!("build/plugins/plugin[{}]", pos + 1)
        })?;
        if artifact_id == FILEVAULT_PLUGIN_ARTIFACT_ID {
            return Ok(Some(idx));
        }
    }
    Ok(None)
}
