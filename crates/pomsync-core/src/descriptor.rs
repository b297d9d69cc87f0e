use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DescriptorError;
use crate::SYSTEM_PATH_BASE;

pub const DEFAULT_SCOPE: &str = "provided";
pub const DEFAULT_TARGET_PATH: &str = "/apps/practicemain-packages/install";
pub const DEFAULT_TYPE: &str = "zip";

/// Type Maven assumes for a `dependency`/`embedded` without a `type` child.
pub const IMPLICIT_TYPE: &str = "jar";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    AddUpdate,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::AddUpdate => "add/update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add/update" => Ok(Action::AddUpdate),
            "delete" => Ok(Action::Delete),
            other => Err(DescriptorError::InvalidValue {
                field: "action",
                value: other.to_string(),
                expected: "add/update, delete",
            }),
        }
    }
}

#[cfg(feature = "clap")]
impl clap::ValueEnum for Action {
    fn value_variants<'a>() -> &'a [Self] {
        const ALL: [Action; 2] = [Action::AddUpdate, Action::Delete];
        &ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

/// How the artifact binary reaches the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Resolved by Maven from a repository.
    Default,
    /// Fetched from `url` into the project's `lib/` tree and referenced with
    /// `system` scope.
    Download,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Default => "default",
            Resolution::Download => "download",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Resolution::Default),
            "download" => Ok(Resolution::Download),
            other => Err(DescriptorError::InvalidValue {
                field: "artifactResolution",
                value: other.to_string(),
                expected: "default, download",
            }),
        }
    }
}

#[cfg(feature = "clap")]
impl clap::ValueEnum for Resolution {
    fn value_variants<'a>() -> &'a [Self] {
        const ALL: [Resolution; 2] = [Resolution::Default, Resolution::Download];
        &ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

/// Descriptor exactly as supplied in the artifacts JSON or on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_resolution: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl RawDescriptor {
    /// Fails on the first of groupId, artifactId, version that is absent or empty.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        let required = [
            ("groupId", &self.group_id),
            ("artifactId", &self.artifact_id),
            ("version", &self.version),
        ];
        for (field, value) in required {
            if value.as_deref().map_or(true, str::is_empty) {
                return Err(DescriptorError::MissingField { field });
            }
        }
        Ok(())
    }

    /// Sets scope, action, targetPath, artifactResolution and type where absent.
    pub fn fill_defaults(&mut self) {
        fill(&mut self.scope, DEFAULT_SCOPE);
        fill(&mut self.action, Action::AddUpdate.as_str());
        fill(&mut self.target_path, DEFAULT_TARGET_PATH);
        fill(&mut self.artifact_resolution, Resolution::Default.as_str());
        fill(&mut self.artifact_type, DEFAULT_TYPE);
    }
}

fn fill(slot: &mut Option<String>, default: &str) {
    if slot.is_none() {
        *slot = Some(default.to_string());
    }
}

/// A validated descriptor with every defaultable field resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    group_id: String,
    artifact_id: String,
    version: String,
    scope: String,
    action: Action,
    target_path: String,
    resolution: Resolution,
    artifact_type: String,
    classifier: Option<String>,
    url: Option<String>,
}

impl ArtifactDescriptor {
    pub fn from_raw(mut raw: RawDescriptor) -> Result<Self, DescriptorError> {
        raw.validate()?;
        raw.fill_defaults();

        let action: Action = raw.action.as_deref().unwrap_or_default().parse()?;
        let resolution: Resolution = raw
            .artifact_resolution
            .as_deref()
            .unwrap_or_default()
            .parse()?;
        let url = raw.url.filter(|u| !u.is_empty());
        if resolution == Resolution::Download && url.is_none() {
            return Err(DescriptorError::MissingField { field: "url" });
        }

        Ok(Self {
            group_id: raw.group_id.unwrap_or_default(),
            artifact_id: raw.artifact_id.unwrap_or_default(),
            version: raw.version.unwrap_or_default(),
            scope: raw.scope.unwrap_or_default(),
            action,
            target_path: raw.target_path.unwrap_or_default(),
            resolution,
            artifact_type: raw.artifact_type.unwrap_or_default(),
            classifier: raw.classifier.filter(|c| !c.is_empty()),
            url,
        })
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, DescriptorError> {
        let raw: RawDescriptor =
            serde_json::from_value(value.clone()).map_err(|e| DescriptorError::Malformed {
                reason: e.to_string(),
            })?;
        Self::from_raw(raw)
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn target_path(&self) -> &str {
        &self.target_path
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn artifact_type(&self) -> &str {
        &self.artifact_type
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// `groupId:artifactId`
    pub fn coordinates(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    /// groupId with dots turned into path separators, e.g. `com/acme`.
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }

    /// `<artifactId>-<version>[-<classifier>].<type>`
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, classifier, self.artifact_type
            ),
            None => format!(
                "{}-{}.{}",
                self.artifact_id, self.version, self.artifact_type
            ),
        }
    }

    /// `systemPath` value pointing at the downloaded file.
    pub fn system_path(&self) -> String {
        format!(
            "{SYSTEM_PATH_BASE}/{}/{}/{}",
            self.group_path(),
            self.artifact_id,
            self.file_name()
        )
    }
}
