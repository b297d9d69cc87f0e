use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    MissingField {
        field: &'static str,
    },
    InvalidValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
    Malformed {
        reason: String,
    },
}

impl DescriptorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DescriptorError::MissingField { .. } => ErrorKind::MissingField,
            DescriptorError::InvalidValue { .. } | DescriptorError::Malformed { .. } => {
                ErrorKind::InvalidValue
            }
        }
    }
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::MissingField { field } => {
                write!(f, "Missing required argument: {field}")
            }
            DescriptorError::InvalidValue {
                field,
                value,
                expected,
            } => write!(
                f,
                "invalid {field} {value:?} (expected one of: {expected})"
            ),
            DescriptorError::Malformed { reason } => {
                write!(f, "malformed artifact descriptor: {reason}")
            }
        }
    }
}

impl std::error::Error for DescriptorError {}

/// Transport failure or non-success HTTP status while fetching an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadError {
    url: String,
    reason: String,
}

impl DownloadError {
    pub fn new(url: &str, reason: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "download {}: {}", self.url, self.reason)
    }
}

impl std::error::Error for DownloadError {}

/// An element the reconcilers rely on lacks a required child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomStructureError {
    element: String,
    missing: &'static str,
}

impl PomStructureError {
    /// `element` is a readable locator such as `dependencies/dependency[2]`.
    pub fn missing_child(element: impl Into<String>, missing: &'static str) -> Self {
        Self {
            element: element.into(),
            missing,
        }
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn missing(&self) -> &str {
        self.missing
    }
}

impl fmt::Display for PomStructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is missing <{}>", self.element, self.missing)
    }
}

impl std::error::Error for PomStructureError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingField,
    InvalidValue,
    Download,
    PomStructure,
    Processing,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MissingField => "missing_field",
            ErrorKind::InvalidValue => "invalid_value",
            ErrorKind::Download => "download",
            ErrorKind::PomStructure => "pom_structure",
            ErrorKind::Processing => "processing",
        }
    }

    /// Classifies an error by the first typed cause found in its chain.
    pub fn of(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(e) = cause.downcast_ref::<DescriptorError>() {
                return e.kind();
            }
            if cause.downcast_ref::<DownloadError>().is_some() {
                return ErrorKind::Download;
            }
            if cause.downcast_ref::<PomStructureError>().is_some() {
                return ErrorKind::PomStructure;
            }
        }
        ErrorKind::Processing
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;

    #[test]
    fn kind_is_found_through_context_layers() {
        let err = Err::<(), _>(DownloadError::new("http://x/a.zip", "HTTP 404"))
            .context("fetch artifact")
            .context("apply com.acme:widget")
            .unwrap_err();
        assert_eq!(ErrorKind::of(&err), ErrorKind::Download);

        let err = anyhow::Error::new(DescriptorError::MissingField { field: "version" });
        assert_eq!(ErrorKind::of(&err), ErrorKind::MissingField);

        let err = anyhow::anyhow!("disk full");
        assert_eq!(ErrorKind::of(&err), ErrorKind::Processing);
    }

    #[test]
    fn missing_field_message_names_field() {
        let err = DescriptorError::MissingField { field: "groupId" };
        assert_eq!(err.to_string(), "Missing required argument: groupId");
    }
}
