//! Append-only log of feedback shown to the learner.
//!
//! Entries are stamped with an id from an injected [`IdGenerator`] and a
//! timestamp. Nothing is ever removed or edited; readers see newest first.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::feedback::templates::Feedback;

/// Source of unique ids for history entries.
pub trait IdGenerator: Send {
    /// Produce the next id. Ids must not repeat within one history.
    fn next_id(&mut self) -> String;
}

/// Monotonic counter ids (`msg-1`, `msg-2`, ...). Deterministic.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    /// Create a counter starting at 1.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("msg")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

/// Random v4 UUID ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// A recorded feedback message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AIMessage {
    pub id: String,
    pub activity_id: String,
    pub activity_title: String,
    pub activity_order: usize,
    pub outcome_key: String,
    pub message: String,
    pub is_success: bool,
    pub timestamp: DateTime<Utc>,
}

/// The append-only feedback history.
pub struct FeedbackHistory {
    /// Oldest first; iteration reverses.
    entries: Vec<AIMessage>,
    ids: Box<dyn IdGenerator>,
}

impl FeedbackHistory {
    /// Create an empty history with the given id source.
    pub fn new(ids: Box<dyn IdGenerator>) -> Self {
        Self {
            entries: Vec::new(),
            ids,
        }
    }

    /// Record feedback with the current time.
    pub fn record(&mut self, feedback: Feedback) -> AIMessage {
        self.record_at(feedback, Utc::now())
    }

    /// Record feedback with a specific timestamp.
    pub fn record_at(&mut self, feedback: Feedback, timestamp: DateTime<Utc>) -> AIMessage {
        let message = AIMessage {
            id: self.ids.next_id(),
            activity_id: feedback.activity_id,
            activity_title: feedback.activity_title,
            activity_order: feedback.activity_order,
            outcome_key: feedback.outcome_key,
            message: feedback.message,
            is_success: feedback.is_success,
            timestamp,
        };
        self.entries.push(message.clone());
        message
    }

    /// All messages, newest first.
    pub fn messages(&self) -> impl Iterator<Item = &AIMessage> {
        self.entries.iter().rev()
    }

    /// The most recent message.
    pub fn latest(&self) -> Option<&AIMessage> {
        self.entries.last()
    }

    /// The most recent message for an activity.
    pub fn latest_for(&self, activity_id: &str) -> Option<&AIMessage> {
        self.messages().find(|m| m.activity_id == activity_id)
    }

    /// Number of recorded messages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FeedbackHistory {
    fn default() -> Self {
        Self::new(Box::new(UuidIds))
    }
}

impl fmt::Debug for FeedbackHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedbackHistory")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}
