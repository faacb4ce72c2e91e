//! Simulated progressive reveal of an already-selected message.
//!
//! A stream only reads its text. Cancelling it stops the reveal and never
//! touches the feedback history, which is written once at selection time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::StreamingConfig;

/// Shared cancellation flag for a reveal or celebration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a live token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every holder of this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether the token was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reveals text a few characters per tick.
#[derive(Debug, Clone)]
pub struct RevealStream {
    text: String,
    /// Byte offset of the revealed prefix; always on a char boundary.
    revealed: usize,
    chars_per_tick: usize,
    tick: Duration,
    token: CancelToken,
}

impl RevealStream {
    /// Create a stream over `text`.
    pub fn new(text: impl Into<String>, config: &StreamingConfig) -> Self {
        Self {
            text: text.into(),
            revealed: 0,
            chars_per_tick: config.chars_per_tick.max(1),
            tick: Duration::from_millis(config.tick_ms),
            token: CancelToken::new(),
        }
    }

    /// Token that cancels this stream.
    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Cancel the reveal.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Suggested delay between ticks.
    pub fn tick_interval(&self) -> Duration {
        self.tick
    }

    /// Text revealed so far.
    pub fn revealed(&self) -> &str {
        &self.text[..self.revealed]
    }

    /// Full text, regardless of progress.
    pub fn full_text(&self) -> &str {
        &self.text
    }

    /// Check whether the whole text has been revealed.
    pub fn is_finished(&self) -> bool {
        self.revealed == self.text.len()
    }

    /// Check whether the stream was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Reveal everything at once (learner skipped the animation).
    pub fn finish(&mut self) -> &str {
        if !self.is_cancelled() {
            self.revealed = self.text.len();
        }
        self.revealed()
    }
}

impl Iterator for RevealStream {
    type Item = String;

    /// Yield the next chunk, or `None` once finished or cancelled.
    fn next(&mut self) -> Option<String> {
        if self.is_cancelled() || self.is_finished() {
            return None;
        }

        let rest = &self.text[self.revealed..];
        let end = rest
            .char_indices()
            .nth(self.chars_per_tick)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let chunk = rest[..end].to_string();
        self.revealed += end;
        Some(chunk)
    }
}
