use std::process::ExitCode;

use clap::Parser;

use pomsync_cli::{Announce, CommonArgs};
use pomsync_core::descriptor::{DEFAULT_SCOPE, DEFAULT_TARGET_PATH, DEFAULT_TYPE};
use pomsync_core::{Action, RawDescriptor, Resolution};

#[derive(Parser, Debug)]
#[command(name = "update-pom")]
#[command(about = "Update Maven POM file.", long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Group ID of the Maven artifact
    group_id: String,
    /// Artifact ID of the Maven artifact
    artifact_id: String,
    /// Version of the Maven artifact
    version: String,
    /// URL to download the Maven artifact
    url: String,

    /// Scope of the Maven artifact
    #[arg(long, default_value = DEFAULT_SCOPE)]
    scope: String,

    /// Action to perform
    #[arg(long, value_enum, default_value_t = Action::AddUpdate)]
    action: Action,

    /// Target path for the embedded artifact
    #[arg(long = "targetPath", default_value = DEFAULT_TARGET_PATH)]
    target_path: String,

    /// Nature of artifact resolution
    #[arg(long = "artifactResolution", value_enum, default_value_t = Resolution::Default)]
    artifact_resolution: Resolution,

    /// Type of the Maven artifact
    #[arg(long = "type", default_value = DEFAULT_TYPE)]
    artifact_type: String,

    /// Classifier of the Maven artifact
    #[arg(long)]
    classifier: Option<String>,
}

impl Cli {
    fn descriptor(&self) -> RawDescriptor {
        RawDescriptor {
            group_id: Some(self.group_id.clone()),
            artifact_id: Some(self.artifact_id.clone()),
            version: Some(self.version.clone()),
            scope: Some(self.scope.clone()),
            action: Some(self.action.as_str().to_string()),
            target_path: Some(self.target_path.clone()),
            artifact_resolution: Some(self.artifact_resolution.as_str().to_string()),
            artifact_type: Some(self.artifact_type.clone()),
            classifier: self.classifier.clone(),
            url: Some(self.url.clone()),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let item = match serde_json::to_value(cli.descriptor()) {
        Ok(item) => item,
        Err(err) => {
            eprintln!("encode artifact descriptor: {err}");
            return ExitCode::from(1);
        }
    };
    pomsync_cli::run(&cli.common, vec![item], Announce::Silent)
}
