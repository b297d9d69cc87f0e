//! Plumbing shared by the `update-pom` and `process-artifacts` binaries.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;

use pomsync_core::batch::{BatchEvent, BatchStage};
use pomsync_core::{
    ArtifactDescriptor, ArtifactReport, ErrorReport, Outcome, PomUpdater, RunReport,
    DEFAULT_ROOT_DIR, ENV_ROOT,
};

#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Project directory holding pom.xml and lib/ (default: $POMSYNC_ROOT, else `all`).
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Print a JSON run report on stdout.
    #[arg(long)]
    pub json: bool,

    /// Suppress progress output on stderr.
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug)]
pub struct Reporter {
    json: bool,
    quiet: bool,
}

impl Reporter {
    pub fn new(args: &CommonArgs) -> Self {
        Self {
            json: args.json,
            quiet: args.quiet,
        }
    }

    pub fn progress(&self, msg: &str) {
        if self.json || self.quiet {
            return;
        }
        eprintln!("{msg}");
    }

    /// Failures are always shown unless a JSON report carries them.
    pub fn failure(&self, msg: &str) {
        if self.json {
            return;
        }
        eprintln!("{msg}");
    }
}

pub fn effective_root(root: Option<PathBuf>) -> PathBuf {
    if let Some(root) = root {
        return root;
    }
    if let Some(v) = std::env::var_os(ENV_ROOT) {
        if !v.is_empty() {
            return PathBuf::from(v);
        }
    }
    PathBuf::from(DEFAULT_ROOT_DIR)
}

/// How the descriptor should be echoed in progress lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announce {
    /// `Processing artifact N: {...}` before each item.
    PerItem,
    Silent,
}

/// Applies `items` to the POM under the effective root and maps the result to
/// an exit code: 0 on success, 1 on any failure.
pub fn run(args: &CommonArgs, items: Vec<Value>, announce: Announce) -> ExitCode {
    let reporter = Reporter::new(args);
    let root = effective_root(args.root.clone());
    let updater = PomUpdater::from_root(&root);
    let pom = updater.pom_path().to_path_buf();

    // A lone descriptor is checked before touching the filesystem.
    if let [item] = items.as_slice() {
        if let Err(err) = ArtifactDescriptor::from_json(item) {
            let err = anyhow::Error::from(err);
            reporter.failure(&format!("Validation error: {err:#}"));
            let error = item_error(&err, 0, item.clone());
            return fail(&reporter, RunReport::failure(pom, Vec::new(), error));
        }
    }

    if let Err(err) = updater.check_writable() {
        reporter.failure(&format!("Write permission is denied for {}.", pom.display()));
        return fail(&reporter, RunReport::failure(pom, Vec::new(), ErrorReport::from_error(&err)));
    }
    reporter.progress(&format!("Write permission is granted for {}.", pom.display()));

    let result = pomsync_core::process_batch(items, &updater, |event| match event {
        BatchEvent::Processing { index, descriptor } => {
            if announce == Announce::PerItem {
                reporter.progress(&format!("Processing artifact {}: {descriptor}", index + 1));
            }
        }
        BatchEvent::Applied {
            descriptor, report, ..
        } => {
            for line in describe(report) {
                reporter.progress(&line);
            }
            if announce == Announce::PerItem {
                reporter.progress(&format!(
                    "Successfully updated POM for artifact: {descriptor}"
                ));
            }
        }
    });

    match result {
        Ok(reports) => {
            if args.json {
                return emit(RunReport::success(pom, reports), ExitCode::SUCCESS);
            }
            ExitCode::SUCCESS
        }
        Err(failure) => {
            match failure.stage {
                BatchStage::Validation => {
                    reporter.failure(&format!("Validation error: {:#}", failure.error));
                }
                BatchStage::Update => {
                    reporter.failure(&format!(
                        "Failed to update POM for artifact: {}",
                        failure.descriptor
                    ));
                    reporter.failure(&format!("{:#}", failure.error));
                }
            }
            let error = item_error(&failure.error, failure.index, failure.descriptor);
            fail(&reporter, RunReport::failure(pom, failure.completed, error))
        }
    }
}

fn item_error(err: &anyhow::Error, index: usize, descriptor: Value) -> ErrorReport {
    let mut error = ErrorReport::from_error(err);
    error.index = Some(index);
    error.descriptor = Some(descriptor);
    error
}

fn fail(reporter: &Reporter, report: RunReport) -> ExitCode {
    if reporter.json {
        return emit(report, ExitCode::from(1));
    }
    ExitCode::from(1)
}

fn emit(report: RunReport, code: ExitCode) -> ExitCode {
    match write_json_stdout(&report) {
        Ok(()) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

pub fn write_json_stdout<T: Serialize>(v: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec(v)?;
    bytes.push(b'\n');
    std::io::stdout()
        .write_all(&bytes)
        .context("write stdout")?;
    Ok(())
}

/// Human-readable progress lines for one applied artifact.
pub fn describe(report: &ArtifactReport) -> Vec<String> {
    let mut lines = Vec::new();
    let coords = &report.coordinates;

    if let Some(download) = &report.download {
        lines.push(format!("Downloaded artifact to {}", display(&download.path)));
        for removed in &download.removed {
            lines.push(format!("Removed stale artifact {}", display(removed)));
        }
    }
    if report.created_dependencies {
        lines.push("Created new dependencies element".to_string());
    }
    match report.dependency {
        Outcome::Added => {
            lines.push(format!("Added new dependency: {coords}"));
            lines.push(format!("Updated dependency: {coords}"));
        }
        Outcome::Updated => lines.push(format!("Updated dependency: {coords}")),
        Outcome::Removed => lines.push(format!("Removed dependency: {coords}")),
        Outcome::NotFound => lines.push(format!("No dependency to remove: {coords}")),
    }
    if report.created_embeddeds {
        lines.push("Created new embeddeds element".to_string());
    }
    match report.embedded {
        Some(Outcome::Added) => {
            lines.push(format!("Added new embedded: {coords}"));
            lines.push(format!("Updated embedded: {coords}"));
        }
        Some(Outcome::Updated) => lines.push(format!("Updated embedded: {coords}")),
        Some(Outcome::Removed) => lines.push(format!("Removed embedded: {coords}")),
        Some(Outcome::NotFound) => lines.push(format!("No embedded to remove: {coords}")),
        None => {}
    }
    lines.push("POM file updated successfully.".to_string());
    lines
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
