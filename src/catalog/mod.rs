//! Lesson catalog for Dojo.
//!
//! The catalog is read-only once loaded. Lessons come from the built-in
//! content compiled into the binary, a single TOML file, or a directory of
//! `lesson_*.toml` files.

pub mod loader;

use std::path::Path;

use crate::config::CatalogConfig;
use crate::core::activity::Lesson;
use crate::error::{DojoError, FailOpen, Result};
use crate::feedback::FeedbackSelector;

pub use loader::{load_dir, load_file, load_path, parse_lessons, validate};

const BUILTIN_LESSONS: &[(&str, &str)] = &[(
    "lesson_01_frontend_review.toml",
    include_str!("../../lessons/lesson_01_frontend_review.toml"),
)];

/// Validated, ordered set of lessons.
#[derive(Debug, Clone)]
pub struct LessonCatalog {
    lessons: Vec<Lesson>,
}

impl LessonCatalog {
    /// Build a catalog, rejecting structurally invalid lessons.
    pub fn new(lessons: Vec<Lesson>) -> Result<Self> {
        validate(&lessons)?;
        Ok(Self { lessons })
    }

    /// The lessons compiled into the binary.
    pub fn builtin() -> Result<Self> {
        let mut lessons = Vec::new();
        for (name, content) in BUILTIN_LESSONS {
            lessons.extend(parse_lessons(content, name)?);
        }
        Self::new(lessons)
    }

    /// Load from a lesson file or directory.
    pub fn load(path: &Path) -> Result<Self> {
        Self::new(load_path(path)?)
    }

    /// Load from the configured source, or the built-in lessons if none is set.
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        match &config.lessons_dir {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    /// Look up a lesson by id.
    pub fn lesson(&self, lesson_id: &str) -> Result<&Lesson> {
        self.lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .ok_or_else(|| DojoError::lesson_not_found(lesson_id))
    }

    /// All lessons in catalog order.
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

/// Built-in feedback templates with the configured overrides applied.
///
/// An unreadable override file is skipped with a warning.
pub fn load_templates(config: &CatalogConfig) -> FeedbackSelector {
    let builtin = FeedbackSelector::builtin();
    match &config.templates_path {
        Some(path) => {
            let overrides =
                FeedbackSelector::load(path).fail_open_default("loading template overrides");
            builtin.merge(overrides)
        }
        None => builtin,
    }
}
