//! Keyboard shortcut sequence recognition
//!
//! This crate turns a stream of raw key presses and releases into matched
//! shortcut sequences such as `Control+K` or `g g`. Key names are normalized,
//! keys held together are grouped into combos, and a rolling history of combos
//! is matched against a trie of registered sequences.
//!
//! [`Engine`] is the synchronous core; [`FlowKeys`] drives it from one or more
//! async input sources.

pub mod buffer;
pub mod combo;
pub mod engine;
pub mod event;
pub mod listener;
pub mod matcher;
pub mod normalize;

pub use buffer::{FinalizePolicy, DEFAULT_DEBOUNCE};
pub use combo::{Combo, Step, StepParseError};
pub use engine::{Engine, Settings};
pub use event::{KeyEvent, KeyEventKind};
pub use listener::{channel, FlowKeys, KeySender, SharedEngine};
pub use matcher::Callback;
pub use normalize::Normalizer;
