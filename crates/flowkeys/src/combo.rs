//! Combo and sequence step types
//!
//! A [`Combo`] is the set of canonical key identifiers that were held together
//! during one press burst. A [`Step`] is one element of a registered sequence:
//! either a single key or a combo, as written by the user before normalization.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Separator used both in textual steps (`"control+k"`) and in combo labels.
pub const COMBO_SEPARATOR: char = '+';

/// A set of keys held simultaneously.
///
/// Members are kept sorted so that the serialized [`label`](Combo::label) is
/// deterministic regardless of the order in which keys went down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Combo(BTreeSet<String>);

impl Combo {
    /// Create an empty combo.
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Add a key to the combo. Returns `false` if it was already present.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.0.insert(key.into())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over members in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Serialized form used as a trie edge: members sorted and joined by `+`.
    ///
    /// ```
    /// use flowkeys::Combo;
    ///
    /// let combo: Combo = ["k", "control"].into_iter().collect();
    /// assert_eq!(combo.label(), "control+k");
    /// ```
    pub fn label(&self) -> String {
        let mut label = String::new();
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                label.push(COMBO_SEPARATOR);
            }
            label.push_str(key);
        }
        label
    }
}

impl<S: Into<String>> FromIterator<S> for Combo {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for Combo {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One step of a registered sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A single key, e.g. `"g"`
    Key(String),
    /// Several keys held together, e.g. `["control", "k"]`
    Combo(Vec<String>),
}

impl Step {
    pub fn key(key: impl Into<String>) -> Self {
        Step::Key(key.into())
    }

    pub fn combo<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Step::Combo(keys.into_iter().map(Into::into).collect())
    }

    /// Raw (unnormalized) key names making up this step.
    pub fn keys(&self) -> &[String] {
        match self {
            Step::Key(key) => std::slice::from_ref(key),
            Step::Combo(keys) => keys,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Key(key) => write!(f, "{}", key),
            Step::Combo(keys) => write!(f, "{}", keys.join("+")),
        }
    }
}

/// Error type for step parsing failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to parse step '{input}': {reason}")]
pub struct StepParseError {
    /// The original input string that failed to parse
    pub input: String,
    /// Description of what went wrong
    pub reason: String,
}

impl FromStr for Step {
    type Err = StepParseError;

    /// Parse a textual step.
    ///
    /// Components are separated by `+`. The plus key itself is written as a
    /// lone `"+"` or as a trailing `"++"` (`"control++"`).
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();

        if input.is_empty() {
            return Err(StepParseError {
                input: input.to_string(),
                reason: "empty input".to_string(),
            });
        }

        if input == "+" {
            return Ok(Step::key("+"));
        }

        let (body, plus_key) = match input.strip_suffix("++") {
            Some(rest) => (rest, true),
            None => (input, false),
        };

        let mut keys = Vec::new();
        for part in body.split(COMBO_SEPARATOR) {
            let part = part.trim();
            if part.is_empty() {
                return Err(StepParseError {
                    input: input.to_string(),
                    reason: "empty component in step".to_string(),
                });
            }
            keys.push(part.to_string());
        }
        if plus_key {
            keys.push("+".to_string());
        }

        if keys.len() == 1 {
            Ok(Step::Key(keys.remove(0)))
        } else {
            Ok(Step::Combo(keys))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combo_label_is_sorted() {
        let a: Combo = ["shift", "control", "k"].into_iter().collect();
        let b: Combo = ["k", "shift", "control"].into_iter().collect();
        assert_eq!(a.label(), "control+k+shift");
        assert_eq!(a.label(), b.label(), "Key order must not affect the label");
    }

    #[test]
    fn test_combo_merges_duplicates() {
        let combo: Combo = ["a", "a", "b"].into_iter().collect();
        assert_eq!(combo.len(), 2);
        assert_eq!(combo.label(), "a+b");
    }

    #[test]
    fn test_parse_single_key() {
        assert_eq!("g".parse::<Step>().unwrap(), Step::key("g"));
        assert_eq!("  Escape ".parse::<Step>().unwrap(), Step::key("Escape"));
    }

    #[test]
    fn test_parse_combo_step() {
        assert_eq!(
            "Control+k".parse::<Step>().unwrap(),
            Step::combo(["Control", "k"])
        );
        assert_eq!(
            "Control + Shift + p".parse::<Step>().unwrap(),
            Step::combo(["Control", "Shift", "p"])
        );
    }

    #[test]
    fn test_parse_plus_key() {
        assert_eq!("+".parse::<Step>().unwrap(), Step::key("+"));
        assert_eq!(
            "control++".parse::<Step>().unwrap(),
            Step::combo(["control", "+"])
        );
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!("".parse::<Step>().is_err());
        assert!("   ".parse::<Step>().is_err());
    }

    #[test]
    fn test_parse_rejects_empty_component() {
        let err = "control+".parse::<Step>().unwrap_err();
        assert_eq!(err.input, "control+");
        assert!(err.reason.contains("empty component"));
        assert!("+k".parse::<Step>().is_err());
        assert!("a++b".parse::<Step>().is_err());
        assert!("++".parse::<Step>().is_err());
    }

    #[test]
    fn test_step_keys() {
        assert_eq!(Step::key("a").keys(), ["a".to_string()]);
        assert_eq!(Step::combo(["a", "b"]).keys().len(), 2);
    }
}
