//! Virtual project state shared across activities.
//!
//! The project is a map of file contents plus a build status. Writes always
//! replace a file's full content, so the last write for a path wins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::activity::FixCheck;

/// Build status of the virtual project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Ok,
    Broken,
}

/// The virtual code state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Project {
    /// File contents keyed by path.
    pub files: BTreeMap<String, String>,
    /// Current build status.
    pub status: ProjectStatus,
}

impl Project {
    /// Create a healthy project from initial file contents.
    pub fn new(files: BTreeMap<String, String>) -> Self {
        Self {
            files,
            status: ProjectStatus::Ok,
        }
    }

    /// Get a file's content.
    pub fn file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Check if the project is currently broken.
    pub fn is_broken(&self) -> bool {
        self.status == ProjectStatus::Broken
    }
}

/// External judge deciding whether a submitted file fixes a broken project.
pub trait FixJudge {
    /// Return true when `content` is an acceptable fix for `path`.
    fn is_fixed(&self, path: &str, content: &str) -> bool;
}

impl<F> FixJudge for F
where
    F: Fn(&str, &str) -> bool,
{
    fn is_fixed(&self, path: &str, content: &str) -> bool {
        self(path, content)
    }
}

impl FixJudge for FixCheck {
    fn is_fixed(&self, _path: &str, content: &str) -> bool {
        self.must_contain.iter().all(|s| content.contains(s.as_str()))
            && !self
                .must_not_contain
                .iter()
                .any(|s| content.contains(s.as_str()))
    }
}

/// Owns the project and applies the only mutations it allows.
#[derive(Debug, Clone, Default)]
pub struct ProjectStateManager {
    project: Project,
}

impl ProjectStateManager {
    /// Create a manager around an initial project.
    pub fn new(project: Project) -> Self {
        Self { project }
    }

    /// Read-only view of the project.
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Mark the project broken. Does not evaluate anything.
    pub fn set_broken(&mut self) {
        self.project.status = ProjectStatus::Broken;
    }

    /// Replace a file's content.
    pub fn apply_edit(&mut self, path: &str, content: &str) {
        self.project
            .files
            .insert(path.to_string(), content.to_string());
    }

    /// Replace a file's content and clear the broken status on a passing verdict.
    ///
    /// Returns the verdict. A failing verdict still writes the content, the
    /// project just stays broken.
    pub fn apply_fix(&mut self, path: &str, content: &str, verdict: bool) -> bool {
        self.apply_edit(path, content);
        if verdict {
            self.project.status = ProjectStatus::Ok;
        }
        verdict
    }
}
