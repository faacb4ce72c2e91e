//! Dojo - Activity progression engine for gamified coding lessons
//!
//! A learner steps through a lesson's activities (code review, constrained
//! editing, branching decisions, break-and-fix debugging), receives
//! pre-authored feedback, and accumulates XP, streak, and lives. The
//! progression engine is the single owner of that state; presentation code
//! drives it through a [`LessonSession`].

pub mod catalog;
pub mod celebration;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod feedback;
pub mod session;

pub use catalog::LessonCatalog;
pub use celebration::{CelebrationHandle, CelebrationSequencer};
pub use config::Config;
pub use core::{
    Activity, ActivityProgressionEngine, ActivityStatus, ActivityType, Advance, GameState,
    Lesson, LessonEvent, Project, ProjectStatus, ReviewAction, Submission, Submitted,
};
pub use error::{DojoError, Result};
pub use feedback::{AIMessage, CancelToken, FeedbackHistory, FeedbackSelector, RevealStream};
pub use session::LessonSession;

// CLI commands
pub use cli::{ConfigCommand, LessonsCommand, PlayCommand, ShowCommand};
