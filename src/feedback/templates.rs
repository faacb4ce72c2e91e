//! Feedback template lookup.
//!
//! Templates are a static table from outcome key to `{is_success, message}`.
//! Message text carries lightweight markup that only the presentation layer
//! interprets; this module stores and returns it verbatim.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::activity::Activity;
use crate::error::{DojoError, FailOpen, Result};

/// Key used when a successful submission has no specific template.
pub const DEFAULT_SUCCESS_KEY: &str = "default-success";

/// Key used when a failed submission has no specific template.
pub const DEFAULT_FAILURE_KEY: &str = "default-failure";

const BUILTIN_TEMPLATES: &str = include_str!("../../lessons/feedback.toml");

/// One pre-authored feedback message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackTemplate {
    pub is_success: bool,
    pub message: String,
}

/// Feedback chosen for a submission, not yet recorded in history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feedback {
    pub activity_id: String,
    pub activity_title: String,
    /// 1-based position of the activity in its lesson.
    pub activity_order: usize,
    /// Template key the message came from.
    pub outcome_key: String,
    pub message: String,
    pub is_success: bool,
}

#[derive(Debug, Default, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    templates: HashMap<String, FeedbackTemplate>,
}

/// Pure lookup from outcome key to feedback.
#[derive(Debug, Clone, Default)]
pub struct FeedbackSelector {
    templates: HashMap<String, FeedbackTemplate>,
}

impl FeedbackSelector {
    /// Create a selector over an explicit table.
    pub fn new(templates: HashMap<String, FeedbackTemplate>) -> Self {
        Self { templates }
    }

    /// The table compiled into the binary.
    pub fn builtin() -> Self {
        Self::from_toml_str(BUILTIN_TEMPLATES).fail_open_default("parsing built-in templates")
    }

    /// Parse a `[templates.<key>]` TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TemplateFile =
            toml::from_str(content).map_err(|e| DojoError::catalog(e.to_string()))?;
        Ok(Self::new(file.templates))
    }

    /// Load a template file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| DojoError::storage(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Overlay another table; its keys replace ours.
    pub fn merge(mut self, other: FeedbackSelector) -> Self {
        self.templates.extend(other.templates);
        self
    }

    /// Look up a template by key.
    pub fn template(&self, key: &str) -> Option<&FeedbackTemplate> {
        self.templates.get(key)
    }

    /// Check whether a key has a template.
    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    /// Number of templates in the table.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Resolve a key to its template.
    ///
    /// An explicit key must exist. Without one, the default success or
    /// failure template is used according to `success`.
    pub fn resolve(
        &self,
        outcome_key: Option<&str>,
        success: bool,
    ) -> Result<(String, &FeedbackTemplate)> {
        let key = match outcome_key {
            Some(key) => key,
            None if success => DEFAULT_SUCCESS_KEY,
            None => DEFAULT_FAILURE_KEY,
        };

        self.templates
            .get(key)
            .map(|template| (key.to_string(), template))
            .ok_or_else(|| DojoError::unknown_outcome(key))
    }

    /// Select feedback for an activity.
    pub fn select(
        &self,
        activity: &Activity,
        activity_order: usize,
        outcome_key: Option<&str>,
        success: bool,
    ) -> Result<Feedback> {
        let (key, template) = self.resolve(outcome_key, success)?;
        Ok(Feedback {
            activity_id: activity.id.clone(),
            activity_title: activity.title.clone(),
            activity_order,
            outcome_key: key,
            message: template.message.clone(),
            is_success: template.is_success,
        })
    }

    /// Return the first candidate key that has a template.
    pub fn first_known<I>(&self, candidates: I) -> Option<String>
    where
        I: IntoIterator<Item = String>,
    {
        candidates.into_iter().find(|key| self.contains(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::activity::ActivityType;

    fn activity() -> Activity {
        Activity::new("act-1", ActivityType::QualityReview, "Review the header")
    }

    #[test]
    fn test_builtin_has_all_outcome_keys() {
        let selector = FeedbackSelector::builtin();
        for key in [
            "act-1-feedback-approve",
            "act-1-feedback-edit",
            "act-1-generate",
            "act-2-success",
            "act-3-context",
            "act-3-zustand",
            "act-3-localstorage",
            "act-4-hint",
            "act-4-success",
            "act-4-wrong",
            DEFAULT_SUCCESS_KEY,
            DEFAULT_FAILURE_KEY,
        ] {
            assert!(selector.contains(key), "missing template {key}");
        }
    }

    #[test]
    fn test_approve_bad_code_is_failure() {
        let selector = FeedbackSelector::builtin();
        let feedback = selector
            .select(&activity(), 1, Some("act-1-feedback-approve"), true)
            .unwrap();
        assert!(!feedback.is_success);
        assert!(feedback.message.starts_with("You approved the code"));
        assert!(feedback.message.contains("`alt`"));
        assert_eq!(feedback.outcome_key, "act-1-feedback-approve");
    }

    #[test]
    fn test_constrained_edit_success() {
        let selector = FeedbackSelector::builtin();
        let feedback = selector
            .select(&activity(), 2, Some("act-2-success"), false)
            .unwrap();
        assert!(feedback.is_success);
        assert!(feedback.message.contains("`useMemo`"));
        assert_eq!(feedback.activity_order, 2);
    }

    #[test]
    fn test_select_is_deterministic() {
        let selector = FeedbackSelector::builtin();
        let a = selector.select(&activity(), 1, Some("act-4-wrong"), false).unwrap();
        let b = selector.select(&activity(), 1, Some("act-4-wrong"), false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_key_falls_back_by_success_flag() {
        let selector = FeedbackSelector::builtin();
        let ok = selector.select(&activity(), 1, None, true).unwrap();
        assert_eq!(ok.outcome_key, DEFAULT_SUCCESS_KEY);
        assert!(ok.is_success);

        let bad = selector.select(&activity(), 1, None, false).unwrap();
        assert_eq!(bad.outcome_key, DEFAULT_FAILURE_KEY);
        assert!(!bad.is_success);
    }

    #[test]
    fn test_unknown_explicit_key_fails() {
        let selector = FeedbackSelector::builtin();
        let err = selector
            .select(&activity(), 1, Some("act-9-nope"), true)
            .unwrap_err();
        assert!(matches!(err, DojoError::UnknownOutcome { key } if key == "act-9-nope"));
    }

    #[test]
    fn test_missing_default_fails() {
        let selector = FeedbackSelector::default();
        let err = selector.select(&activity(), 1, None, true).unwrap_err();
        assert!(matches!(err, DojoError::UnknownOutcome { .. }));
    }

    #[test]
    fn test_merge_overrides_keys() {
        let overrides = FeedbackSelector::from_toml_str(
            r#"
[templates.default-success]
is_success = true
message = "Nice."
"#,
        )
        .unwrap();

        let selector = FeedbackSelector::builtin().merge(overrides);
        assert_eq!(selector.template(DEFAULT_SUCCESS_KEY).unwrap().message, "Nice.");
        assert!(selector.contains("act-2-success"));
    }

    #[test]
    fn test_first_known() {
        let selector = FeedbackSelector::builtin();
        let key = selector.first_known(vec![
            "act-3-redux".to_string(),
            "act-3-zustand".to_string(),
        ]);
        assert_eq!(key.as_deref(), Some("act-3-zustand"));
        assert!(selector.first_known(vec!["nope".to_string()]).is_none());
    }

    #[test]
    fn test_invalid_template_file() {
        let result = FeedbackSelector::from_toml_str("[templates.x]\nis_success = \"maybe\"");
        assert!(matches!(result, Err(DojoError::Catalog { .. })));
    }
}
