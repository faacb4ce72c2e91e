//! Show command for Dojo.
//!
//! Prints a lesson's activities with the statuses they have at lesson start.

use serde::{Deserialize, Serialize};

use crate::catalog::LessonCatalog;
use crate::cli::{render, OutputOptions};
use crate::config::Config;
use crate::core::activity::{Activity, ActivityStatus};
use crate::core::engine::ActivityProgressionEngine;
use crate::error::DojoError;
use crate::feedback::FeedbackSelector;

/// One activity row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityInfo {
    /// 1-based position.
    pub order: usize,
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub title: String,
    pub status: ActivityStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub target_files: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub hints: usize,
}

impl ActivityInfo {
    fn from_activity(order: usize, activity: &Activity) -> Self {
        Self {
            order,
            id: activity.id.clone(),
            activity_type: activity.activity_type.as_str().to_string(),
            title: activity.title.clone(),
            status: activity.status,
            target_files: activity.target_files.clone(),
            options: activity.options.iter().map(|o| o.id.clone()).collect(),
            hints: activity.hints.len(),
        }
    }
}

/// Output format for the show command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub activities: Vec<ActivityInfo>,
    pub files: Vec<String>,
    /// True when the failure was an unknown lesson id.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub not_found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ShowOutput {
    pub fn failure(error: &DojoError) -> Self {
        Self {
            success: false,
            lesson_id: None,
            title: None,
            activities: Vec::new(),
            files: Vec::new(),
            not_found: matches!(error, DojoError::LessonNotFound { .. }),
            error: Some(error.to_string()),
        }
    }
}

/// The show command implementation.
pub struct ShowCommand {
    catalog: LessonCatalog,
    config: Config,
}

impl ShowCommand {
    pub fn new(catalog: LessonCatalog, config: Config) -> Self {
        Self { catalog, config }
    }

    pub fn run(&self, lesson_id: &str) -> ShowOutput {
        let lesson = match self.catalog.lesson(lesson_id) {
            Ok(lesson) => lesson.clone(),
            Err(e) => return ShowOutput::failure(&e),
        };

        let files = lesson.files.keys().cloned().collect();
        let engine =
            ActivityProgressionEngine::new(lesson, FeedbackSelector::default(), &self.config.game);

        ShowOutput {
            success: true,
            lesson_id: Some(engine.lesson_id().to_string()),
            title: Some(engine.lesson_title().to_string()),
            activities: engine
                .activities()
                .iter()
                .enumerate()
                .map(|(i, a)| ActivityInfo::from_activity(i + 1, a))
                .collect(),
            files,
            not_found: false,
            error: None,
        }
    }

    pub fn format_output(&self, output: &ShowOutput, options: OutputOptions) -> String {
        render(output, options, format_text)
    }
}

fn status_marker(status: ActivityStatus) -> &'static str {
    match status {
        ActivityStatus::Completed => "✓",
        ActivityStatus::Current => "▶",
        ActivityStatus::Locked => "🔒",
    }
}

fn format_text(output: &ShowOutput) -> String {
    if !output.success {
        return format!(
            "Show failed: {}\n",
            output.error.as_deref().unwrap_or("unknown error")
        );
    }

    let mut lines = vec![format!(
        "{} ({})\n",
        output.title.as_deref().unwrap_or_default(),
        output.lesson_id.as_deref().unwrap_or_default()
    )];

    for activity in &output.activities {
        lines.push(format!(
            "{} {}. [{}] {}",
            status_marker(activity.status),
            activity.order,
            activity.activity_type,
            activity.title
        ));
        if !activity.target_files.is_empty() {
            lines.push(format!("     Files: {}", activity.target_files.join(", ")));
        }
        if !activity.options.is_empty() {
            lines.push(format!("     Options: {}", activity.options.join(", ")));
        }
    }

    if !output.files.is_empty() {
        lines.push(String::new());
        lines.push(format!("Project files: {}", output.files.join(", ")));
    }
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> ShowCommand {
        ShowCommand::new(LessonCatalog::builtin().unwrap(), Config::default())
    }

    #[test]
    fn test_show_initial_statuses() {
        let output = command().run("frontend-review");
        assert!(output.success);
        let statuses: Vec<ActivityStatus> = output.activities.iter().map(|a| a.status).collect();
        assert_eq!(
            statuses,
            vec![
                ActivityStatus::Current,
                ActivityStatus::Locked,
                ActivityStatus::Locked,
                ActivityStatus::Locked
            ]
        );
        assert_eq!(output.activities[2].options.len(), 3);
        assert_eq!(output.files.len(), 3);
    }

    #[test]
    fn test_show_unknown_lesson() {
        let output = command().run("nope");
        assert!(!output.success);
        assert!(output.not_found);
        assert!(format_text(&output).contains("lesson not found"));
    }

    #[test]
    fn test_text_format() {
        let cmd = command();
        let text = cmd.format_output(&cmd.run("frontend-review"), OutputOptions::default());
        assert!(text.contains("▶ 1. [quality_review]"));
        assert!(text.contains("Options: context, zustand, localstorage"));
    }

    #[test]
    fn test_json_type_field() {
        let cmd = command();
        let json = cmd.format_output(
            &cmd.run("frontend-review"),
            OutputOptions {
                json: true,
                quiet: false,
            },
        );
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["activities"][3]["type"], "break_and_fix");
        assert_eq!(parsed["activities"][0]["status"], "current");
    }
}
