//! Unified error types for Dojo.
//!
//! Engine errors are local-validation failures: an operation either fully
//! applies or fully rejects, and a rejected call leaves the lesson state
//! untouched. The session continues after any of them. Infrastructure errors
//! (catalog files, config) are reported separately and may be handled
//! fail-open by callers that can substitute defaults.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Dojo operations.
#[derive(Error, Debug)]
pub enum DojoError {
    /// Submission or advance for an activity that is not the current one.
    #[error("invalid transition: {message}")]
    InvalidTransition { message: String },

    /// Navigation to an activity that is still locked.
    #[error("activity {index} is locked")]
    LockedActivity { index: usize },

    /// Decision option id not offered by the activity.
    #[error("unknown option '{option_id}' for activity {activity_id}")]
    InvalidOption {
        activity_id: String,
        option_id: String,
    },

    /// Feedback key with no template and no derivable default.
    #[error("no feedback template for outcome '{key}'")]
    UnknownOutcome { key: String },

    /// Requested lesson id absent from the catalog.
    #[error("lesson not found: {lesson_id}")]
    LessonNotFound { lesson_id: String },

    /// Submission payload does not fit the activity type.
    #[error("payload mismatch: {message}")]
    PayloadMismatch { message: String },

    /// Constrained edit changed a line outside the editable regions.
    #[error("line {line} of {path} is outside the editable regions")]
    ProtectedRegion { path: String, line: usize },

    /// I/O errors while reading catalogs or config files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// Malformed lesson or feedback template definitions.
    #[error("catalog error: {message}")]
    Catalog { message: String },
}

/// A specialized Result type for Dojo operations.
pub type Result<T> = std::result::Result<T, DojoError>;

impl DojoError {
    /// Create an invalid transition error.
    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::InvalidTransition {
            message: message.into(),
        }
    }

    /// Create a locked activity error.
    pub fn locked_activity(index: usize) -> Self {
        Self::LockedActivity { index }
    }

    /// Create an invalid option error.
    pub fn invalid_option(activity_id: impl Into<String>, option_id: impl Into<String>) -> Self {
        Self::InvalidOption {
            activity_id: activity_id.into(),
            option_id: option_id.into(),
        }
    }

    /// Create an unknown outcome error.
    pub fn unknown_outcome(key: impl Into<String>) -> Self {
        Self::UnknownOutcome { key: key.into() }
    }

    /// Create a lesson not found error.
    pub fn lesson_not_found(lesson_id: impl Into<String>) -> Self {
        Self::LessonNotFound {
            lesson_id: lesson_id.into(),
        }
    }

    /// Create a payload mismatch error.
    pub fn payload_mismatch(message: impl Into<String>) -> Self {
        Self::PayloadMismatch {
            message: message.into(),
        }
    }

    /// Create a protected region error.
    pub fn protected_region(path: impl Into<String>, line: usize) -> Self {
        Self::ProtectedRegion {
            path: path.into(),
            line,
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a catalog error.
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Check if this error is a usage error from lesson validation.
    ///
    /// Usage errors come from a misdriven presentation layer. They never
    /// mutate state and the session stays usable afterwards.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. }
                | Self::LockedActivity { .. }
                | Self::InvalidOption { .. }
                | Self::UnknownOutcome { .. }
                | Self::LessonNotFound { .. }
                | Self::PayloadMismatch { .. }
                | Self::ProtectedRegion { .. }
        )
    }
}

impl From<io::Error> for DojoError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for DojoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Used where a missing optional input (user config, template overrides)
/// should degrade to defaults instead of stopping the lesson.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the Dojo CLI.
pub mod exit_codes {
    /// Command completed.
    pub const SUCCESS: i32 = 0;

    /// Command failed (bad input, invalid catalog, rejected step).
    pub const ERROR: i32 = 1;

    /// Requested lesson does not exist.
    pub const NOT_FOUND: i32 = 2;

    /// Process panicked.
    pub const CRASH: i32 = 3;
}
