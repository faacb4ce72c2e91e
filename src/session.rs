//! Lesson session: the presentation-facing entry point.
//!
//! A session owns one progression engine and one celebration sequencer and
//! maps each presentation callback onto exactly one engine operation. After
//! every submission that completes an activity it opens a celebration gate,
//! and it only advances the engine when that same gate resolves.

use std::collections::HashMap;
use std::time::Instant;

use crate::celebration::{CelebrationHandle, CelebrationSequencer};
use crate::config::{Config, StreamingConfig};
use crate::core::activity::{Activity, ActivityType, Lesson};
use crate::core::engine::{ActivityProgressionEngine, Advance, ReviewAction, Submission, Submitted};
use crate::error::{DojoError, Result};
use crate::feedback::{CancelToken, FeedbackSelector, RevealStream};

/// One learner's run through a lesson.
#[derive(Debug)]
pub struct LessonSession {
    engine: ActivityProgressionEngine,
    celebration: CelebrationSequencer,
    streaming: StreamingConfig,
    /// Hints already served, per activity id.
    hints_served: HashMap<String, usize>,
    /// Tokens of reveals handed out, cancelled on teardown.
    reveals: Vec<CancelToken>,
    torn_down: bool,
}

impl LessonSession {
    /// Start a session for a lesson.
    pub fn new(lesson: Lesson, selector: FeedbackSelector, config: &Config) -> Self {
        let engine = ActivityProgressionEngine::new(lesson, selector, &config.game);
        Self::with_engine(engine, config)
    }

    /// Wrap an engine that was configured by the caller.
    pub fn with_engine(engine: ActivityProgressionEngine, config: &Config) -> Self {
        Self {
            engine,
            celebration: CelebrationSequencer::new(&config.celebration),
            streaming: config.streaming.clone(),
            hints_served: HashMap::new(),
            reveals: Vec::new(),
            torn_down: false,
        }
    }

    /// Read access to the engine state.
    pub fn engine(&self) -> &ActivityProgressionEngine {
        &self.engine
    }

    /// The live celebration gate, if one is waiting.
    pub fn pending_celebration(&self) -> Option<&CelebrationHandle> {
        self.celebration.pending()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    // =========================================================================
    // Presentation callbacks
    // =========================================================================

    /// The learner accepted the activity as shown (approve on a review).
    pub fn on_activity_complete(
        &mut self,
        activity_id: &str,
        outcome_key: Option<&str>,
    ) -> Result<Submitted> {
        self.submit(activity_id, Submission::Review(ReviewAction::Approve), outcome_key)
    }

    /// The learner picked a decision option.
    pub fn on_decide(&mut self, option_id: &str) -> Result<Submitted> {
        let activity_id = self.current_id()?;
        self.submit(
            &activity_id,
            Submission::Decision {
                option_id: option_id.to_string(),
            },
            None,
        )
    }

    /// The learner submitted code for the current activity.
    pub fn on_code_submit(
        &mut self,
        code: &str,
        path: Option<&str>,
        outcome_key: Option<&str>,
    ) -> Result<Submitted> {
        let activity_id = self.current_id()?;
        self.submit(
            &activity_id,
            Submission::Code {
                path: path.map(str::to_string),
                code: code.to_string(),
            },
            outcome_key,
        )
    }

    /// The learner answered a true/false statement.
    pub fn on_answer(&mut self, value: bool) -> Result<Submitted> {
        let activity_id = self.current_id()?;
        self.submit(&activity_id, Submission::Answer { value }, None)
    }

    /// Submit any payload for an activity and open a celebration if it completed.
    pub fn submit(
        &mut self,
        activity_id: &str,
        submission: Submission,
        outcome_key: Option<&str>,
    ) -> Result<Submitted> {
        self.ensure_live()?;
        let submitted = self.engine.submit(activity_id, submission, outcome_key)?;

        if submitted.completed {
            self.celebration
                .trigger(submitted.reward.xp_earned, Instant::now());
        }
        Ok(submitted)
    }

    /// Serve the next hint for the current activity as a reveal.
    ///
    /// Authored hints come first, in order; once they run out the activity's
    /// `<id>-hint` template is used. Hints never touch history or game state.
    pub fn on_request_hint(&mut self) -> Result<Option<RevealStream>> {
        self.ensure_live()?;
        let Some(activity) = self.engine.current() else {
            return Ok(None);
        };

        let served = self.hints_served.get(&activity.id).copied().unwrap_or(0);
        let text = match activity.hints.get(served) {
            Some(hint) => Some(hint.clone()),
            None => self.template_text(activity, "hint"),
        };

        let Some(text) = text else {
            return Ok(None);
        };
        let activity_id = activity.id.clone();
        *self.hints_served.entry(activity_id).or_insert(0) += 1;
        Ok(Some(self.reveal(text)))
    }

    /// Ask for a fresh version of the generated code on a review.
    ///
    /// Informational only; returns `None` when the current activity is not
    /// a review or has no `<id>-generate` template.
    pub fn on_regenerate(&mut self) -> Result<Option<RevealStream>> {
        self.ensure_live()?;
        let text = match self.engine.current() {
            Some(activity) if activity.activity_type == ActivityType::QualityReview => {
                self.template_text(activity, "generate")
            }
            _ => None,
        };
        Ok(text.map(|t| self.reveal(t)))
    }

    /// The learner dismissed the celebration.
    ///
    /// Advances only if a live gate resolves; otherwise nothing happens.
    pub fn continue_celebration(&mut self) -> Result<Option<Advance>> {
        self.ensure_live()?;
        let Some(handle) = self.celebration.pending().cloned() else {
            return Ok(None);
        };
        if !self.celebration.resolve(&handle) {
            return Ok(None);
        }
        self.engine.advance().map(Some)
    }

    /// Let time pass: resolves an auto-continuing celebration and advances.
    pub fn tick(&mut self, now: Instant) -> Result<Option<Advance>> {
        self.ensure_live()?;
        match self.celebration.poll(now) {
            Some(_) => self.engine.advance().map(Some),
            None => Ok(None),
        }
    }

    /// View an activity without changing its status.
    pub fn go_to(&mut self, index: usize) -> Result<&Activity> {
        self.ensure_live()?;
        self.engine.go_to(index)
    }

    /// Error text to show while the project is broken.
    pub fn broken_preview(&self) -> Option<&str> {
        if !self.engine.project().is_broken() {
            return None;
        }
        self.engine.current()?.error_message.as_deref()
    }

    /// Cancel pending celebrations and reveals. The session rejects further calls.
    pub fn teardown(&mut self) {
        self.celebration.cancel_all();
        for token in self.reveals.drain(..) {
            token.cancel();
        }
        self.torn_down = true;
        tracing::debug!(lesson = %self.engine.lesson_id(), "session torn down");
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_live(&self) -> Result<()> {
        if self.torn_down {
            return Err(DojoError::invalid_transition("session was torn down"));
        }
        Ok(())
    }

    fn current_id(&self) -> Result<String> {
        self.engine
            .current()
            .map(|a| a.id.clone())
            .ok_or_else(|| DojoError::invalid_transition("lesson is already complete"))
    }

    fn template_text(&self, activity: &Activity, suffix: &str) -> Option<String> {
        self.engine
            .selector()
            .template(&format!("{}-{}", activity.id, suffix))
            .map(|t| t.message.clone())
    }

    fn reveal(&mut self, text: String) -> RevealStream {
        let stream = RevealStream::new(text, &self.streaming);
        self.reveals.retain(|t| !t.is_cancelled());
        self.reveals.push(stream.cancel_token());
        stream
    }
}
