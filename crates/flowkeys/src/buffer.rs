//! Combo buffer: press/release tracking and combo finalization
//!
//! # Key State
//!
//! ```text
//!   ┌──────┐   press    ┌────────┐
//!   │  UP  │ ─────────► │  DOWN  │
//!   │      │ ◄───────── │        │
//!   └──────┘  release   └────────┘
//! ```
//!
//! Finalizing a combo is an action attached to one of these transitions (or to
//! the debounce timer firing), never a state of its own. Which transition
//! carries it depends on the [`FinalizePolicy`]:
//!
//! ## Release-edge (default)
//!
//! - A press of a key that is not already down opens a burst.
//! - The first release of a down key while a burst is open finalizes the set of
//!   held keys *before* that key is removed, and closes the burst.
//! - Later releases in the same burst only remove keys.
//! - A press of a key that is already down (auto-repeat) is ignored.
//!
//! Holding `Control`, tapping `k`, then tapping `j` yields two combos:
//! `control+k` and `control+j`.
//!
//! ## Debounce
//!
//! - A press of a key that is not already down records it in the burst and
//!   (re)schedules a finalize task `delay` after the press.
//! - Releases only remove keys from the held set.
//! - When the task is due, the burst keys plus any keys still held become the
//!   combo, and the burst starts over.
//!
//! Either way a burst produces exactly one combo, and that combo is appended to
//! a bounded rolling history.

use std::collections::{BTreeSet, VecDeque};
use std::time::{Duration, Instant};

use crate::combo::Combo;

/// Default debounce delay.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(30);

/// How a press burst is turned into a finalized combo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FinalizePolicy {
    /// Finalize on the first release of a burst
    #[default]
    ReleaseEdge,
    /// Finalize once no new key has gone down for `delay`
    Debounce { delay: Duration },
}

impl FinalizePolicy {
    /// Debounce policy with the default 30ms delay.
    pub fn debounce() -> Self {
        FinalizePolicy::Debounce {
            delay: DEFAULT_DEBOUNCE,
        }
    }
}

/// A cancellable, scheduled combo finalization.
///
/// Only one can be pending at a time: scheduling again replaces the previous
/// deadline (cancel-and-restart).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduledFinalize {
    deadline: Option<Instant>,
}

impl ScheduledFinalize {
    pub fn schedule(&mut self, at: Instant) {
        self.deadline = Some(at);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.map_or(false, |deadline| deadline <= now)
    }
}

/// Tracks held keys and the rolling history of finalized combos.
///
/// All keys handed to the buffer must already be canonical.
#[derive(Debug, Clone, Default)]
pub struct ComboBuffer {
    policy: FinalizePolicy,
    /// Keys currently down
    pressed: BTreeSet<String>,
    /// Release-edge: whether a burst is open
    assembling: bool,
    /// Debounce: keys that went down since the last finalization
    burst: Combo,
    /// Debounce: pending finalization
    timer: ScheduledFinalize,
    /// Finalized combos, oldest first
    history: VecDeque<Combo>,
}

impl ComboBuffer {
    pub fn new(policy: FinalizePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> FinalizePolicy {
        self.policy
    }

    /// Handle a key going down.
    ///
    /// Returns `false` if the key was already down and the event was ignored.
    pub fn press(&mut self, key: &str, now: Instant) -> bool {
        if !self.pressed.insert(key.to_string()) {
            return false;
        }

        match self.policy {
            FinalizePolicy::ReleaseEdge => {
                self.assembling = true;
            }
            FinalizePolicy::Debounce { delay } => {
                self.burst.insert(key);
                self.timer.schedule(now + delay);
            }
        }

        true
    }

    /// Handle a key going up, returning the combo finalized by this release.
    pub fn release(&mut self, key: &str) -> Option<Combo> {
        if !self.pressed.contains(key) {
            return None;
        }

        let finalized = match self.policy {
            FinalizePolicy::ReleaseEdge if self.assembling => {
                self.assembling = false;
                Some(self.pressed.iter().cloned().collect())
            }
            _ => None,
        };

        self.pressed.remove(key);
        finalized
    }

    /// Drop `key` from the held set without finalizing anything.
    ///
    /// Used when the source that pressed it goes away before releasing it.
    pub fn forget(&mut self, key: &str) -> bool {
        if !self.pressed.remove(key) {
            return false;
        }
        if self.pressed.is_empty() {
            self.assembling = false;
        }
        true
    }

    /// Fire the debounce task if it is due, returning the finalized combo.
    pub fn poll(&mut self, now: Instant) -> Option<Combo> {
        if !self.timer.is_due(now) {
            return None;
        }
        self.timer.cancel();

        let mut combo = std::mem::take(&mut self.burst);
        combo.extend(self.pressed.iter().cloned());

        if combo.is_empty() {
            None
        } else {
            Some(combo)
        }
    }

    /// When the pending debounce task is due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Append a finalized combo, evicting the oldest entries beyond `cap`.
    pub fn push(&mut self, combo: Combo, cap: usize) {
        self.history.push_back(combo);
        while self.history.len() > cap {
            self.history.pop_front();
        }
    }

    /// Finalized combos, oldest first.
    pub fn history(&self) -> &VecDeque<Combo> {
        &self.history
    }

    pub fn pressed(&self) -> &BTreeSet<String> {
        &self.pressed
    }

    /// Cancel any pending task and forget all keys and history.
    pub fn clear(&mut self) {
        self.timer.cancel();
        self.pressed.clear();
        self.assembling = false;
        self.burst = Combo::new();
        self.history.clear();
    }
}
