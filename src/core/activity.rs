//! Lesson and activity types for Dojo.
//!
//! Activities are loaded once per lesson and are immutable apart from their
//! `status`, which only the progression engine mutates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One lesson: an ordered sequence of activities over a virtual project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lesson {
    /// Unique lesson identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Optional display description.
    #[serde(default)]
    pub description: Option<String>,
    /// Initial contents of the virtual project, keyed by path.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Activities in lesson order.
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl Lesson {
    /// Find an activity by id.
    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }
}

/// Activity variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// Review AI-generated code: approve it or fix it by hand.
    QualityReview,
    /// Edit code inside highlighted regions only.
    ConstrainedEdit,
    /// Pick one of several mutually exclusive options.
    DecisionFork,
    /// Start from a broken project and submit a corrective edit.
    BreakAndFix,
    /// Answer a true/false statement.
    TrueFalse,
}

impl ActivityType {
    /// Whether submissions of this type carry code.
    pub fn edits_code(&self) -> bool {
        matches!(
            self,
            ActivityType::QualityReview | ActivityType::ConstrainedEdit | ActivityType::BreakAndFix
        )
    }

    /// Whether a failed submission leaves the activity open for another try.
    pub fn retries_on_failure(&self) -> bool {
        matches!(self, ActivityType::BreakAndFix)
    }

    /// Stable name used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::QualityReview => "quality_review",
            ActivityType::ConstrainedEdit => "constrained_edit",
            ActivityType::DecisionFork => "decision_fork",
            ActivityType::BreakAndFix => "break_and_fix",
            ActivityType::TrueFalse => "true_false",
        }
    }
}

/// Progression status of a single activity.
///
/// Transitions are one-directional: Locked → Current → Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    #[default]
    Locked,
    Current,
    Completed,
}

/// One step in a lesson.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    /// Unique, stable identifier.
    pub id: String,
    /// Variant tag.
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// Display title.
    pub title: String,
    /// Display instructions.
    #[serde(default)]
    pub instructions: String,
    /// Files the activity edits, first one is the default target.
    #[serde(default)]
    pub target_files: Vec<String>,
    /// Editable line ranges (constrained edits only), applied to every target file.
    #[serde(default)]
    pub editable_regions: Vec<EditableRegion>,
    /// Options for decision forks.
    #[serde(default)]
    pub options: Vec<DecisionOption>,
    /// Answer key for true/false activities.
    #[serde(default)]
    pub true_false_config: Option<TrueFalseConfig>,
    /// Hints served in order on request.
    #[serde(default)]
    pub hints: Vec<String>,
    /// Contents written into the project when a break-and-fix activity starts.
    #[serde(default)]
    pub broken_files: BTreeMap<String, String>,
    /// Default judge for break-and-fix submissions.
    #[serde(default)]
    pub fix_check: Option<FixCheck>,
    /// Error text shown while the project is broken.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Progression status. Reset by the engine at lesson start.
    #[serde(default)]
    pub status: ActivityStatus,
}

impl Activity {
    /// Create an activity with only the required fields set.
    pub fn new(
        id: impl Into<String>,
        activity_type: ActivityType,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            activity_type,
            title: title.into(),
            instructions: String::new(),
            target_files: Vec::new(),
            editable_regions: Vec::new(),
            options: Vec::new(),
            true_false_config: None,
            hints: Vec::new(),
            broken_files: BTreeMap::new(),
            fix_check: None,
            error_message: None,
            status: ActivityStatus::Locked,
        }
    }

    /// Add a target file.
    pub fn with_target(mut self, path: impl Into<String>) -> Self {
        self.target_files.push(path.into());
        self
    }

    /// Add a decision option.
    pub fn with_option(mut self, option: DecisionOption) -> Self {
        self.options.push(option);
        self
    }

    /// Add an editable region.
    pub fn with_region(mut self, region: EditableRegion) -> Self {
        self.editable_regions.push(region);
        self
    }

    /// Set the fix check used to judge break-and-fix submissions.
    pub fn with_fix_check(mut self, check: FixCheck) -> Self {
        self.fix_check = Some(check);
        self
    }

    /// Set the true/false answer key.
    pub fn with_true_false(mut self, correct_answer: bool, explanation: impl Into<String>) -> Self {
        self.true_false_config = Some(TrueFalseConfig {
            correct_answer,
            explanation: explanation.into(),
        });
        self
    }

    /// Add a hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Look up a decision option by id.
    pub fn option(&self, option_id: &str) -> Option<&DecisionOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// The default file edited by this activity.
    pub fn primary_target(&self) -> Option<&str> {
        self.target_files.first().map(String::as_str)
    }
}

/// A range of editable lines (1-based, inclusive) with an optional hint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EditableRegion {
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default)]
    pub hint: Option<String>,
}

impl EditableRegion {
    /// Create a region without a hint.
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
            hint: None,
        }
    }

    /// Check whether a 1-based line falls inside this region.
    pub fn contains(&self, line: usize) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }
}

/// One choice of a decision fork.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecisionOption {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub impact: String,
}

impl DecisionOption {
    /// Create an option with empty description and impact text.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            impact: String::new(),
        }
    }
}

/// Answer key for a true/false activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrueFalseConfig {
    pub correct_answer: bool,
    #[serde(default)]
    pub explanation: String,
}

/// Substring heuristic deciding whether a broken file has been fixed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FixCheck {
    /// Every snippet must appear in the submitted content.
    #[serde(default)]
    pub must_contain: Vec<String>,
    /// No snippet may appear in the submitted content.
    #[serde(default)]
    pub must_not_contain: Vec<String>,
}

impl FixCheck {
    /// Require a snippet to be present.
    pub fn requiring(mut self, snippet: impl Into<String>) -> Self {
        self.must_contain.push(snippet.into());
        self
    }

    /// Require a snippet to be absent.
    pub fn forbidding(mut self, snippet: impl Into<String>) -> Self {
        self.must_not_contain.push(snippet.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_type_serde_names() {
        let json = serde_json::to_string(&ActivityType::BreakAndFix).unwrap();
        assert_eq!(json, "\"break_and_fix\"");
        let parsed: ActivityType = serde_json::from_str("\"decision_fork\"").unwrap();
        assert_eq!(parsed, ActivityType::DecisionFork);
    }

    #[test]
    fn test_only_break_and_fix_retries() {
        assert!(ActivityType::BreakAndFix.retries_on_failure());
        assert!(!ActivityType::QualityReview.retries_on_failure());
        assert!(!ActivityType::ConstrainedEdit.retries_on_failure());
        assert!(!ActivityType::DecisionFork.retries_on_failure());
        assert!(!ActivityType::TrueFalse.retries_on_failure());
    }

    #[test]
    fn test_status_defaults_to_locked() {
        assert_eq!(ActivityStatus::default(), ActivityStatus::Locked);
        let activity = Activity::new("a", ActivityType::TrueFalse, "Quiz");
        assert_eq!(activity.status, ActivityStatus::Locked);
    }

    #[test]
    fn test_option_lookup() {
        let activity = Activity::new("act-3", ActivityType::DecisionFork, "State")
            .with_option(DecisionOption::new("context", "Context"))
            .with_option(DecisionOption::new("zustand", "Zustand"));
        assert_eq!(activity.option("zustand").unwrap().label, "Zustand");
        assert!(activity.option("redux").is_none());
    }

    #[test]
    fn test_region_contains_is_inclusive() {
        let region = EditableRegion::new(3, 5);
        assert!(!region.contains(2));
        assert!(region.contains(3));
        assert!(region.contains(5));
        assert!(!region.contains(6));
    }

    #[test]
    fn test_primary_target() {
        let activity = Activity::new("a", ActivityType::ConstrainedEdit, "Edit")
            .with_target("src/List.tsx")
            .with_target("src/Item.tsx");
        assert_eq!(activity.primary_target(), Some("src/List.tsx"));
    }

    #[test]
    fn test_activity_from_toml() {
        let activity: Activity = toml::from_str(
            r#"
id = "act-4"
type = "break_and_fix"
title = "Fix the checkout"
target_files = ["src/CheckoutPage.tsx"]

[fix_check]
must_contain = ["?? []"]
"#,
        )
        .unwrap();

        assert_eq!(activity.activity_type, ActivityType::BreakAndFix);
        assert_eq!(activity.status, ActivityStatus::Locked);
        assert_eq!(activity.fix_check.unwrap().must_contain, vec!["?? []"]);
        assert!(activity.options.is_empty());
    }
}
