//! Celebration gate between a completed activity and the next one.
//!
//! A gate is a logical delay, not a timer: time only moves when the caller
//! passes an [`Instant`] to [`CelebrationSequencer::poll`]. At most one gate
//! is live. Triggering a new gate or cancelling supersedes the old one, and
//! a superseded handle can never resolve.

use std::time::{Duration, Instant};

use crate::config::CelebrationConfig;
use crate::feedback::CancelToken;

/// Handle to one triggered celebration.
#[derive(Debug, Clone)]
pub struct CelebrationHandle {
    id: u64,
    xp_earned: u32,
    started: Instant,
    token: CancelToken,
}

impl CelebrationHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// XP shown by this celebration.
    pub fn xp_earned(&self) -> u32 {
        self.xp_earned
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Check whether the gate was cancelled or superseded.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Issues and resolves celebration gates.
#[derive(Debug)]
pub struct CelebrationSequencer {
    auto_continue: Option<Duration>,
    next_id: u64,
    live: Option<CelebrationHandle>,
}

impl CelebrationSequencer {
    /// Create a sequencer. A zero `auto_continue_ms` disables auto-continue.
    pub fn new(config: &CelebrationConfig) -> Self {
        Self {
            auto_continue: (config.auto_continue_ms > 0)
                .then(|| Duration::from_millis(config.auto_continue_ms)),
            next_id: 1,
            live: None,
        }
    }

    /// Open a gate for a reward. Any live gate is cancelled first.
    pub fn trigger(&mut self, xp_earned: u32, now: Instant) -> CelebrationHandle {
        self.cancel_all();

        let handle = CelebrationHandle {
            id: self.next_id,
            xp_earned,
            started: now,
            token: CancelToken::new(),
        };
        self.next_id += 1;
        self.live = Some(handle.clone());

        tracing::debug!(gate = handle.id, xp = xp_earned, "celebration started");
        handle
    }

    /// The live gate, if any.
    pub fn pending(&self) -> Option<&CelebrationHandle> {
        self.live.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.live.is_some()
    }

    /// Resolve a gate because the learner chose to continue.
    ///
    /// Returns false for stale or cancelled handles.
    pub fn resolve(&mut self, handle: &CelebrationHandle) -> bool {
        match &self.live {
            Some(live) if live.id == handle.id && !live.is_cancelled() => {
                self.live = None;
                tracing::debug!(gate = handle.id, "celebration continued");
                true
            }
            _ => false,
        }
    }

    /// Resolve the live gate if its auto-continue delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<CelebrationHandle> {
        let delay = self.auto_continue?;
        let live = self.live.as_ref()?;
        if live.is_cancelled() || now.saturating_duration_since(live.started) < delay {
            return None;
        }

        tracing::debug!(gate = live.id, "celebration auto-continued");
        self.live.take()
    }

    /// Cancel the live gate so it can never resolve.
    pub fn cancel_all(&mut self) {
        if let Some(live) = self.live.take() {
            live.token.cancel();
            tracing::debug!(gate = live.id, "celebration cancelled");
        }
    }
}
