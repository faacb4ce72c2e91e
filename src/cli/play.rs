//! Play command for Dojo.
//!
//! Replays a scripted list of learner actions through a lesson session and
//! reports the outcome of each step. Rejected steps are reported and the
//! script continues, the same way a session survives a misdriven UI.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::LessonCatalog;
use crate::cli::{render, OutputOptions};
use crate::config::Config;
use crate::core::engine::{Advance, ReviewAction, Submission, Submitted};
use crate::core::game::GameState;
use crate::error::{DojoError, Result};
use crate::feedback::{FeedbackSelector, RevealStream};
use crate::session::LessonSession;

/// One scripted learner action.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Approve the current review.
    Approve {
        #[serde(default)]
        outcome: Option<String>,
    },
    /// Fix the current review by hand.
    Edit {
        code: String,
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        outcome: Option<String>,
    },
    /// Submit code for the current activity.
    Code {
        code: String,
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        outcome: Option<String>,
    },
    Decide { option: String },
    Answer { value: bool },
    Hint,
    Regenerate,
    /// Dismiss the celebration and advance.
    Continue,
    GoTo { index: usize },
}

impl ScriptStep {
    fn name(&self) -> &'static str {
        match self {
            ScriptStep::Approve { .. } => "approve",
            ScriptStep::Edit { .. } => "edit",
            ScriptStep::Code { .. } => "code",
            ScriptStep::Decide { .. } => "decide",
            ScriptStep::Answer { .. } => "answer",
            ScriptStep::Hint => "hint",
            ScriptStep::Regenerate => "regenerate",
            ScriptStep::Continue => "continue",
            ScriptStep::GoTo { .. } => "go_to",
        }
    }
}

/// A play script: `[[steps]]` tables in order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

impl Script {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DojoError::serde(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| DojoError::storage(path, e))?;
        Self::parse(&content)
    }
}

/// Result of one step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepReport {
    /// 1-based step number.
    pub step: usize,
    pub action: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// Feedback, hint, or explanation text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced_to: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub lesson_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepReport {
    fn new(step: usize, action: &str) -> Self {
        Self {
            step,
            action: action.to_string(),
            ok: true,
            ..Default::default()
        }
    }

    fn rejected(mut self, error: &DojoError) -> Self {
        self.ok = false;
        self.error = Some(error.to_string());
        self
    }

    fn submitted(mut self, submitted: &Submitted) -> Self {
        self.activity_id = Some(submitted.feedback.activity_id.clone());
        self.outcome_key = Some(submitted.feedback.outcome_key.clone());
        self.is_success = Some(submitted.feedback.is_success);
        self.completed = Some(submitted.completed);
        self.message = Some(match &submitted.explanation {
            Some(explanation) => format!("{}\n\n{}", submitted.feedback.message, explanation),
            None => submitted.feedback.message.clone(),
        });
        self
    }

    fn revealed(mut self, stream: Option<RevealStream>) -> Self {
        self.message = stream.map(|s| s.collect());
        self
    }

    fn advanced(mut self, advance: Option<Advance>) -> Self {
        match advance {
            Some(Advance::Moved { activity_id, .. }) => self.advanced_to = Some(activity_id),
            Some(Advance::LessonComplete) => self.lesson_complete = true,
            None => {}
        }
        self
    }
}

/// Output format for the play command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<String>,
    pub steps: Vec<StepReport>,
    /// Number of steps the session rejected.
    pub rejected: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_state: Option<GameState>,
    pub lesson_complete: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub not_found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlayOutput {
    pub fn failure(error: &DojoError) -> Self {
        Self {
            success: false,
            lesson_id: None,
            steps: Vec::new(),
            rejected: 0,
            game_state: None,
            lesson_complete: false,
            not_found: matches!(error, DojoError::LessonNotFound { .. }),
            error: Some(error.to_string()),
        }
    }
}

/// The play command implementation.
pub struct PlayCommand {
    catalog: LessonCatalog,
    selector: FeedbackSelector,
    config: Config,
}

impl PlayCommand {
    pub fn new(catalog: LessonCatalog, selector: FeedbackSelector, config: Config) -> Self {
        Self {
            catalog,
            selector,
            config,
        }
    }

    /// Load the script from disk and play it.
    pub fn run(&self, lesson_id: &str, script_path: &Path) -> PlayOutput {
        match Script::load(script_path) {
            Ok(script) => self.play(lesson_id, &script),
            Err(e) => PlayOutput::failure(&e),
        }
    }

    /// Play a parsed script.
    pub fn play(&self, lesson_id: &str, script: &Script) -> PlayOutput {
        let lesson = match self.catalog.lesson(lesson_id) {
            Ok(lesson) => lesson.clone(),
            Err(e) => return PlayOutput::failure(&e),
        };

        let mut session = LessonSession::new(lesson, self.selector.clone(), &self.config);
        let steps: Vec<StepReport> = script
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let report = StepReport::new(i + 1, step.name());
                match run_step(&mut session, step, report.clone()) {
                    Ok(report) => report,
                    Err(e) => {
                        tracing::debug!(step = i + 1, error = %e, "step rejected");
                        report.rejected(&e)
                    }
                }
            })
            .collect();

        let engine = session.engine();
        let output = PlayOutput {
            success: true,
            lesson_id: Some(engine.lesson_id().to_string()),
            rejected: steps.iter().filter(|s| !s.ok).count(),
            steps,
            game_state: Some(engine.game_state()),
            lesson_complete: engine.is_complete(),
            not_found: false,
            error: None,
        };
        session.teardown();
        output
    }

    pub fn format_output(&self, output: &PlayOutput, options: OutputOptions) -> String {
        render(output, options, format_text)
    }
}

fn current_id(session: &LessonSession) -> Result<String> {
    session
        .engine()
        .current()
        .map(|a| a.id.clone())
        .ok_or_else(|| DojoError::invalid_transition("lesson is already complete"))
}

fn run_step(session: &mut LessonSession, step: &ScriptStep, report: StepReport) -> Result<StepReport> {
    Ok(match step {
        ScriptStep::Approve { outcome } => {
            let id = current_id(session)?;
            report.submitted(&session.on_activity_complete(&id, outcome.as_deref())?)
        }
        ScriptStep::Edit {
            code,
            path,
            outcome,
        } => {
            let id = current_id(session)?;
            let submission = Submission::Review(ReviewAction::Edit {
                path: path.clone(),
                code: code.clone(),
            });
            report.submitted(&session.submit(&id, submission, outcome.as_deref())?)
        }
        ScriptStep::Code {
            code,
            path,
            outcome,
        } => report.submitted(&session.on_code_submit(
            code,
            path.as_deref(),
            outcome.as_deref(),
        )?),
        ScriptStep::Decide { option } => report.submitted(&session.on_decide(option)?),
        ScriptStep::Answer { value } => report.submitted(&session.on_answer(*value)?),
        ScriptStep::Hint => report.revealed(session.on_request_hint()?),
        ScriptStep::Regenerate => report.revealed(session.on_regenerate()?),
        ScriptStep::Continue => report.advanced(session.continue_celebration()?),
        ScriptStep::GoTo { index } => {
            let activity = session.go_to(*index)?;
            let mut report = report;
            report.activity_id = Some(activity.id.clone());
            report
        }
    })
}

fn format_text(output: &PlayOutput) -> String {
    if !output.success {
        return format!(
            "Play failed: {}\n",
            output.error.as_deref().unwrap_or("unknown error")
        );
    }

    let mut lines = Vec::new();
    for step in &output.steps {
        let header = match (&step.activity_id, step.is_success) {
            _ if !step.ok => format!(
                "{}. {} ✗ {}",
                step.step,
                step.action,
                step.error.as_deref().unwrap_or("rejected")
            ),
            (Some(id), Some(true)) => format!("{}. {} {} ✓", step.step, step.action, id),
            (Some(id), Some(false)) => format!("{}. {} {} ✗", step.step, step.action, id),
            (Some(id), None) => format!("{}. {} {}", step.step, step.action, id),
            (None, _) => format!("{}. {}", step.step, step.action),
        };
        lines.push(header);

        if let Some(message) = &step.message {
            for line in message.lines() {
                lines.push(format!("   {}", line));
            }
        }
        if let Some(next) = &step.advanced_to {
            lines.push(format!("   → {}", next));
        }
        if step.lesson_complete {
            lines.push("   Lesson complete!".to_string());
        }
    }

    if let Some(state) = &output.game_state {
        lines.push(String::new());
        lines.push(format!(
            "Lives: {} | Streak: {} | XP: {}",
            state.lives, state.streak, state.xp
        ));
    }
    if output.rejected > 0 {
        lines.push(format!("{} step(s) rejected", output.rejected));
    }
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SCRIPT: &str = r#"
[[steps]]
action = "hint"

[[steps]]
action = "approve"
outcome = "act-1-feedback-approve"

[[steps]]
action = "continue"

[[steps]]
action = "go_to"
index = 3

[[steps]]
action = "code"
outcome = "act-2-success"
code = """
import { useMemo, useCallback } from 'react';
export function ProductList({ items, onSelect }) {
  const sorted = useMemo(() => [...items].sort((a, b) => a.price - b.price), [items]);
  const handleClick = useCallback((id) => onSelect(id), [onSelect]);
  return <ul>{sorted.map((p) => <li key={p.id} onClick={() => handleClick(p.id)}>{p.name}</li>)}</ul>;
}"""
"#;

    fn command() -> PlayCommand {
        PlayCommand::new(
            LessonCatalog::builtin().unwrap(),
            FeedbackSelector::builtin(),
            Config::default(),
        )
    }

    #[test]
    fn test_parse_script() {
        let script = Script::parse(SCRIPT).unwrap();
        assert_eq!(script.steps.len(), 5);
        assert_eq!(script.steps[0], ScriptStep::Hint);
        assert_eq!(script.steps[3], ScriptStep::GoTo { index: 3 });
    }

    #[test]
    fn test_play_reports_each_step() {
        let script = Script::parse(SCRIPT).unwrap();
        let output = command().play("frontend-review", &script);

        assert!(output.success);
        assert_eq!(output.steps.len(), 5);
        assert!(output.steps[0].message.is_some());
        assert_eq!(output.steps[1].is_success, Some(false));
        assert_eq!(output.steps[2].advanced_to.as_deref(), Some("act-2"));
        // act-4 is still locked
        assert!(!output.steps[3].ok);
        // the import line is outside the editable region
        assert!(!output.steps[4].ok);
        assert!(output.steps[4]
            .error
            .as_deref()
            .unwrap()
            .contains("outside the editable regions"));
        assert_eq!(output.rejected, 2);

        let state = output.game_state.unwrap();
        assert_eq!(state.lives, 2);
        assert_eq!(state.xp, 0);
    }

    #[test]
    fn test_play_unknown_lesson() {
        let output = command().play("missing", &Script::default());
        assert!(!output.success);
        assert!(output.not_found);
    }

    #[test]
    fn test_run_missing_script() {
        let temp = TempDir::new().unwrap();
        let output = command().run("frontend-review", &temp.path().join("none.toml"));
        assert!(!output.success);
        assert!(!output.not_found);
    }

    #[test]
    fn test_text_format() {
        let script = Script::parse(SCRIPT).unwrap();
        let cmd = command();
        let text = cmd.format_output(
            &cmd.play("frontend-review", &script),
            OutputOptions::default(),
        );
        assert!(text.contains("2. approve act-1 ✗"));
        assert!(text.contains("→ act-2"));
        assert!(text.contains("Lives: 2 | Streak: 0 | XP: 0"));
        assert!(text.contains("2 step(s) rejected"));
    }
}
