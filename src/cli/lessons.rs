//! Lessons command for Dojo.
//!
//! Lists the lessons in the active catalog.

use serde::{Deserialize, Serialize};

use crate::catalog::LessonCatalog;
use crate::cli::{render, OutputOptions};
use crate::core::activity::Lesson;

/// Summary of one lesson.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonInfo {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub activities: usize,
}

impl LessonInfo {
    pub fn from_lesson(lesson: &Lesson) -> Self {
        Self {
            id: lesson.id.clone(),
            title: lesson.title.clone(),
            description: lesson.description.clone(),
            activities: lesson.activities.len(),
        }
    }
}

/// Output format for the lessons command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonsOutput {
    pub success: bool,
    pub count: usize,
    pub lessons: Vec<LessonInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LessonsOutput {
    pub fn success(lessons: Vec<LessonInfo>) -> Self {
        Self {
            success: true,
            count: lessons.len(),
            lessons,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            count: 0,
            lessons: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The lessons command implementation.
pub struct LessonsCommand {
    catalog: LessonCatalog,
}

impl LessonsCommand {
    pub fn new(catalog: LessonCatalog) -> Self {
        Self { catalog }
    }

    pub fn run(&self) -> LessonsOutput {
        LessonsOutput::success(
            self.catalog
                .lessons()
                .iter()
                .map(LessonInfo::from_lesson)
                .collect(),
        )
    }

    pub fn format_output(&self, output: &LessonsOutput, options: OutputOptions) -> String {
        render(output, options, format_text)
    }
}

fn format_text(output: &LessonsOutput) -> String {
    if !output.success {
        return format!(
            "Listing lessons failed: {}\n",
            output.error.as_deref().unwrap_or("unknown error")
        );
    }

    if output.lessons.is_empty() {
        return "No lessons found.\n".to_string();
    }

    let mut lines = vec![format!("Found {} lesson(s):\n", output.count)];
    for lesson in &output.lessons {
        lines.push(format!(
            "{}  {} ({} activities)",
            lesson.id, lesson.title, lesson.activities
        ));
        if let Some(description) = &lesson.description {
            lines.push(format!("    {}", description));
        }
    }
    lines.push(String::new());
    lines.join("\n")
}
