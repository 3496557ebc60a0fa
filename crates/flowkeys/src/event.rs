//! Raw key events delivered by an input source

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEventKind {
    Press,
    Release,
}

/// A single press or release of a raw (unnormalized) key identifier.
///
/// Serialized as `{"type": "press", "key": "Control"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    #[serde(rename = "type")]
    pub kind: KeyEventKind,
    pub key: String,
}

impl KeyEvent {
    pub fn press(key: impl Into<String>) -> Self {
        Self {
            kind: KeyEventKind::Press,
            key: key.into(),
        }
    }

    pub fn release(key: impl Into<String>) -> Self {
        Self {
            kind: KeyEventKind::Release,
            key: key.into(),
        }
    }
}
