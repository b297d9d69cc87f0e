//! Find-or-create / update / delete of `dependency` and `embedded` elements.
//!
//! A `dependency` is keyed by (groupId, artifactId, type, classifier) and an
//! `embedded` by (groupId, artifactId, type); a missing `type` child means
//! `jar`. The first match is the one acted on and no call ever creates a second
//! element for a key that already has one.

use std::fmt;

use serde::Serialize;

use crate::descriptor::{Action, ArtifactDescriptor, Resolution, IMPLICIT_TYPE};
use crate::error::PomStructureError;
use crate::pom::Element;

pub const DEPENDENCY_CHILD_ORDER: [&str; 7] = [
    "groupId",
    "artifactId",
    "version",
    "type",
    "classifier",
    "scope",
    "systemPath",
];

pub const EMBEDDED_CHILD_ORDER: [&str; 4] = ["groupId", "artifactId", "type", "target"];

pub const SYSTEM_SCOPE: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Added,
    Updated,
    Removed,
    /// A delete found nothing to remove.
    NotFound,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Added => "added",
            Outcome::Updated => "updated",
            Outcome::Removed => "removed",
            Outcome::NotFound => "not_found",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn reconcile_dependency(
    dependencies: &mut Element,
    d: &ArtifactDescriptor,
) -> Result<Outcome, PomStructureError> {
    let found = find_dependency(dependencies, d)?;

    if d.action() == Action::Delete {
        return Ok(match found {
            Some(idx) => {
                dependencies.remove_node(idx);
                Outcome::Removed
            }
            None => Outcome::NotFound,
        });
    }

    match found.and_then(|idx| dependencies.element_at_mut(idx)) {
        Some(dependency) => {
            apply_dependency_fields(dependency, d);
            Ok(Outcome::Updated)
        }
        None => {
            let mut dependency = dependencies.new_child("dependency");
            dependency.set_child_text("groupId", d.group_id(), &DEPENDENCY_CHILD_ORDER);
            dependency.set_child_text("artifactId", d.artifact_id(), &DEPENDENCY_CHILD_ORDER);
            dependency.set_child_text("type", d.artifact_type(), &DEPENDENCY_CHILD_ORDER);
            apply_dependency_fields(&mut dependency, d);
            dependencies.push_element(dependency);
            Ok(Outcome::Added)
        }
    }
}

fn apply_dependency_fields(dependency: &mut Element, d: &ArtifactDescriptor) {
    let order = &DEPENDENCY_CHILD_ORDER;
    dependency.set_child_text("version", d.version(), order);

    match d.classifier() {
        Some(classifier) => dependency.set_child_text("classifier", classifier, order),
        None => {
            dependency.remove_children("classifier");
        }
    }

    match d.resolution() {
        Resolution::Download => {
            dependency.set_child_text("scope", SYSTEM_SCOPE, order);
            dependency.set_child_text("systemPath", &d.system_path(), order);
        }
        Resolution::Default => {
            dependency.set_child_text("scope", d.scope(), order);
            dependency.remove_children("systemPath");
        }
    }
}

fn find_dependency(
    dependencies: &Element,
    d: &ArtifactDescriptor,
) -> Result<Option<usize>, PomStructureError> {
    for (pos, (idx, dependency)) in dependencies.indexed_children("dependency").enumerate() {
        let locator = || format!("dependencies/dependency[{}]", pos + 1);
        let group_id = required_text(dependency, "groupId", locator)?;
        let artifact_id = required_text(dependency, "artifactId", locator)?;
        let artifact_type = effective_type(dependency);
        let classifier = dependency
            .child_text("classifier")
            .filter(|c| !c.is_empty());

        if group_id == d.group_id()
            && artifact_id == d.artifact_id()
            && artifact_type == d.artifact_type()
            && classifier.as_deref() == d.classifier()
        {
            return Ok(Some(idx));
        }
    }
    Ok(None)
}

pub fn reconcile_embedded(
    embeddeds: &mut Element,
    d: &ArtifactDescriptor,
) -> Result<Outcome, PomStructureError> {
    let found = find_embedded(embeddeds, d)?;

    if d.action() == Action::Delete {
        return Ok(match found {
            Some(idx) => {
                embeddeds.remove_node(idx);
                Outcome::Removed
            }
            None => Outcome::NotFound,
        });
    }

    match found.and_then(|idx| embeddeds.element_at_mut(idx)) {
        Some(embedded) => {
            embedded.set_child_text("target", d.target_path(), &EMBEDDED_CHILD_ORDER);
            Ok(Outcome::Updated)
        }
        None => {
            let mut embedded = embeddeds.new_child("embedded");
            embedded.set_child_text("groupId", d.group_id(), &EMBEDDED_CHILD_ORDER);
            embedded.set_child_text("artifactId", d.artifact_id(), &EMBEDDED_CHILD_ORDER);
            embedded.set_child_text("type", d.artifact_type(), &EMBEDDED_CHILD_ORDER);
            embedded.set_child_text("target", d.target_path(), &EMBEDDED_CHILD_ORDER);
            embeddeds.push_element(embedded);
            Ok(Outcome::Added)
        }
    }
}

fn find_embedded(
    embeddeds: &Element,
    d: &ArtifactDescriptor,
) -> Result<Option<usize>, PomStructureError> {
    for (pos, (idx, embedded)) in embeddeds.indexed_children("embedded").enumerate() {
        let locator = || format!("embeddeds/embedded[{}]", pos + 1);
        let group_id = required_text(embedded, "groupId", locator)?;
        let artifact_id = required_text(embedded, "artifactId", locator)?;
        if group_id == d.group_id()
            && artifact_id == d.artifact_id()
            && effective_type(embedded) == d.artifact_type()
        {
            return Ok(Some(idx));
        }
    }
    Ok(None)
}

fn effective_type(el: &Element) -> String {
    el.child_text("type")
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| IMPLICIT_TYPE.to_string())
}

pub(crate) fn required_text(
    el: &Element,
    child: &'static str,
    locator: impl Fn() -> String,
) -> Result<String, PomStructureError> {
    el.child_text(child)
        .ok_or_else(|| PomStructureError::missing_child(locator(), child))
}
