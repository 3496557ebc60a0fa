//! Synchronous recognition engine
//!
//! [`Engine`] ties the three parts together:
//!
//! ```text
//! raw press/release ─► Normalizer ─► ComboBuffer ─► finalized combo
//!                                                        │
//!                                   rolling history ◄────┘
//!                                          │
//!                                   SequenceMatcher ─► callbacks
//! ```
//!
//! It owns no clock and no input source: every entry point takes `now`, and
//! debounce timing is driven by whoever calls [`Engine::poll`] at
//! [`Engine::next_deadline`]. See [`crate::listener`] for the async driver.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use crate::buffer::{ComboBuffer, FinalizePolicy};
use crate::combo::{Combo, Step};
use crate::event::{KeyEvent, KeyEventKind};
use crate::matcher::{Callback, SequenceMatcher};
use crate::normalize::Normalizer;

/// Per-instance engine settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    pub policy: FinalizePolicy,
}

/// Keyboard shortcut recognizer.
#[derive(Debug, Default)]
pub struct Engine {
    normalizer: Normalizer,
    buffer: ComboBuffer,
    matcher: SequenceMatcher,
}

impl Engine {
    pub fn new(policy: FinalizePolicy) -> Self {
        Self {
            normalizer: Normalizer::new(),
            buffer: ComboBuffer::new(policy),
            matcher: SequenceMatcher::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.policy)
    }

    pub fn policy(&self) -> FinalizePolicy {
        self.buffer.policy()
    }

    /// Make `alternates` collapse onto `canonical` during normalization.
    pub fn add_alias<I, S>(&mut self, canonical: &str, alternates: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.normalizer.add_alias(canonical, alternates);
    }

    /// Register `callback` for `sequence`.
    ///
    /// Returns `false` (and registers nothing) for an empty sequence.
    pub fn register<F>(&mut self, sequence: &[Step], callback: F) -> bool
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register_callback(sequence, Arc::new(callback))
    }

    /// Like [`register`](Self::register) with an already shared callback.
    pub fn register_callback(&mut self, sequence: &[Step], callback: Callback) -> bool {
        let combos: Vec<Combo> = sequence
            .iter()
            .map(|step| self.normalizer.normalize_combo(step.keys()))
            .collect();

        let registered = self.matcher.register(&combos, callback);
        if registered {
            tracing::debug!(
                "Registered sequence: {}",
                combos
                    .iter()
                    .map(Combo::label)
                    .collect::<Vec<_>>()
                    .join(" ")
            );
        } else {
            tracing::debug!("Ignoring empty sequence");
        }
        registered
    }

    /// Handle a key going down. Returns the number of callbacks invoked.
    pub fn press(&mut self, raw: &str, now: Instant) -> usize {
        // A debounce task that came due before this press belongs to the
        // previous burst.
        let fired = self.poll(now);

        let key = self.normalizer.normalize_key(raw);
        if self.buffer.press(&key, now) {
            tracing::trace!("Key down: {} ({})", key, raw);
        } else {
            tracing::trace!("Ignoring repeat press: {}", key);
        }

        fired
    }

    /// Handle a key going up. Returns the number of callbacks invoked.
    pub fn release(&mut self, raw: &str, now: Instant) -> usize {
        let mut fired = self.poll(now);

        let key = self.normalizer.normalize_key(raw);
        tracing::trace!("Key up: {} ({})", key, raw);
        if let Some(combo) = self.buffer.release(&key) {
            fired += self.finalize(combo);
        }

        fired
    }

    pub fn handle(&mut self, event: &KeyEvent, now: Instant) -> usize {
        match event.kind {
            KeyEventKind::Press => self.press(&event.key, now),
            KeyEventKind::Release => self.release(&event.key, now),
        }
    }

    /// Canonical form of `raw` under the current aliases.
    pub fn normalize_key(&self, raw: &str) -> String {
        self.normalizer.normalize_key(raw)
    }

    /// Treat `keys` as no longer held, without finalizing a combo.
    ///
    /// For keys whose source stopped before releasing them. Returns how many
    /// were actually down.
    pub fn release_all<I, S>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dropped = 0;
        for raw in keys {
            let key = self.normalizer.normalize_key(raw.as_ref());
            if self.buffer.forget(&key) {
                tracing::debug!("Dropping held key: {}", key);
                dropped += 1;
            }
        }
        dropped
    }

    /// Run the debounce task if it is due. Returns the number of callbacks
    /// invoked.
    pub fn poll(&mut self, now: Instant) -> usize {
        match self.buffer.poll(now) {
            Some(combo) => self.finalize(combo),
            None => 0,
        }
    }

    /// When [`poll`](Self::poll) should next be called, if a debounce task is
    /// pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.buffer.next_deadline()
    }

    pub fn max_sequence_length(&self) -> usize {
        self.matcher.max_sequence_length()
    }

    /// Finalized combos currently in the rolling buffer, oldest first.
    pub fn history(&self) -> &VecDeque<Combo> {
        self.buffer.history()
    }

    /// Canonical keys currently held.
    pub fn pressed(&self) -> &BTreeSet<String> {
        self.buffer.pressed()
    }

    /// Forget everything: held keys, history, pending task, registered
    /// sequences and aliases.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.matcher.clear();
        self.normalizer.clear();
    }

    fn finalize(&mut self, combo: Combo) -> usize {
        tracing::debug!("Combo: {}", combo);
        self.buffer.push(combo, self.matcher.max_sequence_length());

        let callbacks = self.matcher.check(self.buffer.history());
        let fired = callbacks.len();
        for callback in callbacks {
            callback();
        }
        fired
    }
}
