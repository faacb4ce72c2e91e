//! Core types and logic for Dojo.
//!
//! This module contains the lesson model, the virtual project, game
//! counters, and the progression engine that ties them together.

pub mod activity;
pub mod engine;
pub mod game;
pub mod project;

pub use activity::{
    Activity, ActivityStatus, ActivityType, DecisionOption, EditableRegion, FixCheck, Lesson,
    TrueFalseConfig,
};
pub use engine::{
    ActivityProgressionEngine, Advance, LessonEvent, ReviewAction, Submission, Submitted,
};
pub use game::{GameState, GameStateTracker, RewardOutcome};
pub use project::{FixJudge, Project, ProjectStateManager, ProjectStatus};
