//! Activity progression engine for Dojo.
//!
//! The engine is the single owner of lesson state: activity statuses, the
//! virtual project, game counters, and feedback history. Every operation
//! validates first and mutates only after all checks (including template
//! resolution) have passed, so a rejected call leaves no trace.
//!
//! Ordering invariant, after every operation:
//! - activities before the current index are `Completed`
//! - activities after it are `Locked`
//! - the current activity is `Current`, or `Completed` while awaiting
//!   [`ActivityProgressionEngine::advance`]
//! - when the lesson is complete, every activity is `Completed`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::core::activity::{Activity, ActivityStatus, ActivityType, Lesson};
use crate::core::game::{GameState, GameStateTracker, RewardOutcome};
use crate::core::project::{FixJudge, Project, ProjectStateManager};
use crate::error::{DojoError, Result};
use crate::feedback::{AIMessage, FeedbackHistory, FeedbackSelector, IdGenerator};

/// Learner action on a quality review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReviewAction {
    /// Accept the generated code as is.
    Approve,
    /// Replace the generated code with a manual fix.
    Edit {
        #[serde(default)]
        path: Option<String>,
        code: String,
    },
}

/// Payload of a submission. Which variant fits depends on the activity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Submission {
    Review(ReviewAction),
    /// Full new content for a file; `path` defaults to the first target file.
    Code {
        #[serde(default)]
        path: Option<String>,
        code: String,
    },
    Decision { option_id: String },
    Answer { value: bool },
}

/// Side events produced by an engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LessonEvent {
    ActivityCompleted { activity_id: String },
    ProjectFixed { activity_id: String },
    LivesExhausted,
    LessonCompleted,
}

/// Result of an accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submitted {
    /// Feedback recorded in history for this submission.
    pub feedback: AIMessage,
    /// Counters after the reward was applied.
    pub game_state: GameState,
    pub reward: RewardOutcome,
    /// Whether the activity is now completed.
    pub completed: bool,
    /// Explanation text for true/false answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub events: Vec<LessonEvent>,
}

/// Result of [`ActivityProgressionEngine::advance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Advance {
    /// The successor is now current.
    Moved {
        index: usize,
        activity_id: String,
        /// Entering the activity broke the project.
        project_broken: bool,
    },
    /// No successor; the lesson is finished.
    LessonComplete,
}

/// What a validated submission will do once committed.
struct Plan {
    edit: Option<PlannedEdit>,
    outcome_key: Option<String>,
    success: bool,
    explanation: Option<String>,
}

struct PlannedEdit {
    path: String,
    code: String,
    /// Fix verdict, present only for break-and-fix submissions.
    verdict: Option<bool>,
}

/// State machine over a lesson's activities.
pub struct ActivityProgressionEngine {
    lesson_id: String,
    lesson_title: String,
    activities: Vec<Activity>,
    /// Index of the current activity; stays on the last one after completion.
    index: usize,
    /// Activity the learner is looking at; never a locked one.
    viewing: usize,
    complete: bool,
    project: ProjectStateManager,
    selector: FeedbackSelector,
    history: FeedbackHistory,
    game: GameStateTracker,
    judge: Option<Box<dyn FixJudge + Send>>,
}

impl ActivityProgressionEngine {
    /// Start a lesson: the first activity becomes current, the rest are locked.
    pub fn new(lesson: Lesson, selector: FeedbackSelector, rules: &GameConfig) -> Self {
        let Lesson {
            id,
            title,
            files,
            mut activities,
            ..
        } = lesson;

        for (i, activity) in activities.iter_mut().enumerate() {
            activity.status = if i == 0 {
                ActivityStatus::Current
            } else {
                ActivityStatus::Locked
            };
        }

        let mut engine = Self {
            lesson_id: id,
            lesson_title: title,
            complete: activities.is_empty(),
            activities,
            index: 0,
            viewing: 0,
            project: ProjectStateManager::new(Project::new(files)),
            selector,
            history: FeedbackHistory::default(),
            game: GameStateTracker::new(rules),
            judge: None,
        };

        if !engine.complete {
            engine.enter(0);
        }
        tracing::debug!(
            lesson = %engine.lesson_id,
            activities = engine.activities.len(),
            "lesson started"
        );
        engine
    }

    /// Use a specific id source for history entries.
    pub fn with_ids(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.history = FeedbackHistory::new(ids);
        self
    }

    /// Judge every break-and-fix submission with `judge` instead of the
    /// activity's own fix check.
    pub fn with_judge(mut self, judge: Box<dyn FixJudge + Send>) -> Self {
        self.judge = Some(judge);
        self
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn lesson_id(&self) -> &str {
        &self.lesson_id
    }

    pub fn lesson_title(&self) -> &str {
        &self.lesson_title
    }

    /// All activities with their current statuses.
    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    /// Index of the current activity, `None` once the lesson is complete.
    pub fn current_index(&self) -> Option<usize> {
        (!self.complete).then_some(self.index)
    }

    /// The current activity, `None` once the lesson is complete.
    pub fn current(&self) -> Option<&Activity> {
        self.current_index().map(|i| &self.activities[i])
    }

    /// Index of the activity being viewed.
    pub fn viewing_index(&self) -> usize {
        self.viewing
    }

    /// Check whether every activity is completed.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn project(&self) -> &Project {
        self.project.project()
    }

    pub fn game_state(&self) -> GameState {
        self.game.state()
    }

    pub fn history(&self) -> &FeedbackHistory {
        &self.history
    }

    pub fn selector(&self) -> &FeedbackSelector {
        &self.selector
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Submit the learner's work for the current activity.
    ///
    /// Applies any file edit, selects feedback, updates game state, records
    /// history, and completes the activity. Does not advance.
    pub fn submit(
        &mut self,
        activity_id: &str,
        submission: Submission,
        outcome_key: Option<&str>,
    ) -> Result<Submitted> {
        let index = self.ensure_current(activity_id)?;
        let activity = &self.activities[index];
        let plan = self.plan(activity, submission, outcome_key)?;
        let feedback = self.selector.select(
            activity,
            index + 1,
            plan.outcome_key.as_deref(),
            plan.success,
        )?;
        let activity_type = activity.activity_type;

        // Everything below is infallible.
        let mut events = Vec::new();

        if let Some(edit) = plan.edit {
            match edit.verdict {
                Some(verdict) => {
                    let was_broken = self.project.project().is_broken();
                    if self.project.apply_fix(&edit.path, &edit.code, verdict) && was_broken {
                        events.push(LessonEvent::ProjectFixed {
                            activity_id: activity_id.to_string(),
                        });
                    }
                }
                None => self.project.apply_edit(&edit.path, &edit.code),
            }
        }

        let is_success = feedback.is_success;
        let reward = self.game.reward(is_success);
        if !is_success && reward.lives_exhausted {
            events.push(LessonEvent::LivesExhausted);
        }

        let message = self.history.record(feedback);
        tracing::debug!(
            activity = activity_id,
            outcome = %message.outcome_key,
            success = is_success,
            "feedback recorded"
        );

        let completed = is_success || !activity_type.retries_on_failure();
        if completed {
            self.activities[index].status = ActivityStatus::Completed;
            events.push(LessonEvent::ActivityCompleted {
                activity_id: activity_id.to_string(),
            });
            tracing::info!(
                lesson = %self.lesson_id,
                activity = activity_id,
                xp = self.game.state().xp,
                "activity completed"
            );

            if index + 1 == self.activities.len() {
                self.complete = true;
                events.push(LessonEvent::LessonCompleted);
                tracing::info!(lesson = %self.lesson_id, "lesson completed");
            }
        }

        Ok(Submitted {
            feedback: message,
            game_state: self.game.state(),
            reward,
            completed,
            explanation: plan.explanation,
            events,
        })
    }

    /// Choose an option on the current decision fork.
    pub fn decide(&mut self, activity_id: &str, option_id: &str) -> Result<Submitted> {
        self.submit(
            activity_id,
            Submission::Decision {
                option_id: option_id.to_string(),
            },
            None,
        )
    }

    /// Move to the next activity once the current one is completed.
    ///
    /// Returns [`Advance::LessonComplete`] without changing anything when
    /// the lesson is already finished.
    pub fn advance(&mut self) -> Result<Advance> {
        if self.complete {
            return Ok(Advance::LessonComplete);
        }

        let current = &self.activities[self.index];
        if current.status != ActivityStatus::Completed {
            return Err(DojoError::invalid_transition(format!(
                "cannot advance past {} before it is completed",
                current.id
            )));
        }

        let next = self.index + 1;
        self.activities[next].status = ActivityStatus::Current;
        self.index = next;
        self.viewing = next;
        let project_broken = self.enter(next);

        tracing::debug!(
            lesson = %self.lesson_id,
            index = next,
            activity = %self.activities[next].id,
            "advanced"
        );

        Ok(Advance::Moved {
            index: next,
            activity_id: self.activities[next].id.clone(),
            project_broken,
        })
    }

    /// View an activity without changing any status.
    ///
    /// Only completed activities and the current one can be viewed.
    pub fn go_to(&mut self, index: usize) -> Result<&Activity> {
        let activity = self.activities.get(index).ok_or_else(|| {
            DojoError::invalid_transition(format!(
                "activity index {} out of range (lesson has {})",
                index,
                self.activities.len()
            ))
        })?;

        if activity.status == ActivityStatus::Locked {
            return Err(DojoError::locked_activity(index));
        }

        self.viewing = index;
        tracing::debug!(lesson = %self.lesson_id, index, "viewing activity");
        Ok(&self.activities[index])
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Validate that `activity_id` names the current, open activity.
    fn ensure_current(&self, activity_id: &str) -> Result<usize> {
        let Some(current) = self.current() else {
            return Err(DojoError::invalid_transition(format!(
                "lesson {} is already complete",
                self.lesson_id
            )));
        };

        if current.id != activity_id {
            return Err(DojoError::invalid_transition(format!(
                "{} is not the current activity ({})",
                activity_id, current.id
            )));
        }

        if current.status == ActivityStatus::Completed {
            return Err(DojoError::invalid_transition(format!(
                "{} is already completed",
                activity_id
            )));
        }

        Ok(self.index)
    }

    /// Run per-type entry effects. Returns true if the project was broken.
    fn enter(&mut self, index: usize) -> bool {
        let activity = &self.activities[index];
        if activity.activity_type != ActivityType::BreakAndFix {
            return false;
        }

        for (path, content) in &activity.broken_files {
            self.project.apply_edit(path, content);
        }
        self.project.set_broken();
        tracing::debug!(activity = %activity.id, "project broken");
        true
    }

    /// Validate a submission against its activity without mutating anything.
    fn plan(
        &self,
        activity: &Activity,
        submission: Submission,
        outcome_key: Option<&str>,
    ) -> Result<Plan> {
        let explicit = outcome_key.map(str::to_string);

        match (activity.activity_type, submission) {
            (ActivityType::QualityReview, Submission::Review(ReviewAction::Approve)) => Ok(Plan {
                edit: None,
                outcome_key: explicit,
                success: true,
                explanation: None,
            }),

            (ActivityType::QualityReview, Submission::Review(ReviewAction::Edit { path, code }))
            | (ActivityType::QualityReview, Submission::Code { path, code }) => {
                let path = resolve_path(activity, path)?;
                Ok(Plan {
                    edit: Some(PlannedEdit {
                        path,
                        code,
                        verdict: None,
                    }),
                    outcome_key: explicit,
                    success: true,
                    explanation: None,
                })
            }

            (ActivityType::ConstrainedEdit, Submission::Code { path, code }) => {
                let path = resolve_path(activity, path)?;
                check_editable_regions(activity, &path, self.project().file(&path), &code)?;
                Ok(Plan {
                    edit: Some(PlannedEdit {
                        path,
                        code,
                        verdict: None,
                    }),
                    outcome_key: explicit,
                    success: true,
                    explanation: None,
                })
            }

            (ActivityType::BreakAndFix, Submission::Code { path, code }) => {
                let path = resolve_path(activity, path)?;
                let verdict = self.judge_fix(activity, &path, &code);
                let outcome_key = self.break_and_fix_key(activity, outcome_key, verdict)?;
                Ok(Plan {
                    edit: Some(PlannedEdit {
                        path,
                        code,
                        verdict: Some(verdict),
                    }),
                    outcome_key,
                    success: verdict,
                    explanation: None,
                })
            }

            (ActivityType::DecisionFork, Submission::Decision { option_id }) => {
                if activity.option(&option_id).is_none() {
                    return Err(DojoError::invalid_option(&activity.id, option_id));
                }
                let outcome_key = explicit.or_else(|| {
                    self.selector
                        .first_known([format!("{}-{}", activity.id, option_id)])
                });
                Ok(Plan {
                    edit: None,
                    outcome_key,
                    success: true,
                    explanation: None,
                })
            }

            (ActivityType::TrueFalse, Submission::Answer { value }) => {
                let config = activity.true_false_config.as_ref().ok_or_else(|| {
                    DojoError::payload_mismatch(format!(
                        "{} has no true/false answer key",
                        activity.id
                    ))
                })?;
                let explanation =
                    (!config.explanation.is_empty()).then(|| config.explanation.clone());
                Ok(Plan {
                    edit: None,
                    outcome_key: explicit,
                    success: value == config.correct_answer,
                    explanation,
                })
            }

            (activity_type, submission) => Err(DojoError::payload_mismatch(format!(
                "{} submission does not fit {} activity {}",
                submission_kind(&submission),
                activity_type.as_str(),
                activity.id
            ))),
        }
    }

    fn judge_fix(&self, activity: &Activity, path: &str, code: &str) -> bool {
        if let Some(judge) = &self.judge {
            return judge.is_fixed(path, code);
        }
        match &activity.fix_check {
            Some(check) => check.is_fixed(path, code),
            None => {
                tracing::warn!(
                    activity = %activity.id,
                    "break-and-fix activity has no fix check, treating submission as not fixed"
                );
                false
            }
        }
    }

    /// Pick the outcome key for a break-and-fix submission.
    ///
    /// The verdict decides success; a caller key whose template disagrees
    /// with it is dropped in favor of the derived key.
    fn break_and_fix_key(
        &self,
        activity: &Activity,
        outcome_key: Option<&str>,
        verdict: bool,
    ) -> Result<Option<String>> {
        if let Some(key) = outcome_key {
            let template = self
                .selector
                .template(key)
                .ok_or_else(|| DojoError::unknown_outcome(key))?;
            if template.is_success == verdict {
                return Ok(Some(key.to_string()));
            }
            tracing::warn!(
                activity = %activity.id,
                key,
                verdict,
                "outcome key disagrees with fix verdict, using derived key"
            );
        }

        let suffix = if verdict { "success" } else { "wrong" };
        Ok(self
            .selector
            .first_known([format!("{}-{}", activity.id, suffix)]))
    }
}

impl fmt::Debug for ActivityProgressionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityProgressionEngine")
            .field("lesson_id", &self.lesson_id)
            .field("index", &self.index)
            .field("viewing", &self.viewing)
            .field("complete", &self.complete)
            .field("game", &self.game.state())
            .field("project_status", &self.project().status)
            .finish_non_exhaustive()
    }
}

/// Pick the file a code submission writes. Only the activity's target files
/// may be written.
fn resolve_path(activity: &Activity, path: Option<String>) -> Result<String> {
    match path {
        Some(path) if activity.target_files.contains(&path) => Ok(path),
        Some(path) => Err(DojoError::payload_mismatch(format!(
            "{} is not a target file of {}",
            path, activity.id
        ))),
        None => activity.primary_target().map(str::to_string).ok_or_else(|| {
            DojoError::payload_mismatch(format!("{} has no target file", activity.id))
        }),
    }
}

fn submission_kind(submission: &Submission) -> &'static str {
    match submission {
        Submission::Review(_) => "review",
        Submission::Code { .. } => "code",
        Submission::Decision { .. } => "decision",
        Submission::Answer { .. } => "answer",
    }
}

/// Reject edits outside the editable regions.
///
/// Lines before the first region must be unchanged, and so must the lines
/// after the last region, matched from the end of the file since regions may
/// grow or shrink.
fn check_editable_regions(
    activity: &Activity,
    path: &str,
    original: Option<&str>,
    code: &str,
) -> Result<()> {
    let (Some(original), Some(first), Some(last)) = (
        original,
        activity.editable_regions.iter().map(|r| r.start_line).min(),
        activity.editable_regions.iter().map(|r| r.end_line).max(),
    ) else {
        return Ok(());
    };

    let old: Vec<&str> = original.lines().collect();
    let new: Vec<&str> = code.lines().collect();

    for line in 1..first {
        if old.get(line - 1) != new.get(line - 1) {
            return Err(DojoError::protected_region(path, line));
        }
    }

    let tail = old.len().saturating_sub(last);
    for k in 0..tail {
        let before = old[old.len() - 1 - k];
        let after = new.len().checked_sub(1 + k).map(|i| new[i]);
        if after != Some(before) {
            return Err(DojoError::protected_region(path, old.len() - k));
        }
    }

    if new.len() < first.saturating_sub(1) + tail {
        return Err(DojoError::protected_region(path, first));
    }

    Ok(())
}
