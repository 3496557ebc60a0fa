//! Key name normalization
//!
//! Raw key identifiers arrive spelled the way the input source spells them
//! (`"Esc"`, `"Ctrl"`, `"ArrowLeft"`, `"K"`). Before a key is stored in a combo
//! or used as a trie edge it is reduced to a canonical form:
//!
//! 1. platform synonyms are substituted (`Esc` -> `Escape`, `Cmd` -> `Meta`, ...)
//! 2. the result is lowercased
//! 3. user-defined aliases collapse alternates onto their canonical key
//!
//! Registration and lookup both go through the same [`Normalizer`], so two
//! equivalent spellings always end up on the same trie edge.

use std::collections::BTreeSet;

use crate::combo::Combo;

/// Map platform/browser-specific key names onto one standard spelling.
///
/// Matching is exact (case-sensitive) and happens before lowercasing.
pub fn standard_key_name(raw: &str) -> Option<&'static str> {
    match raw {
        "Esc" => Some("Escape"),
        "Del" => Some("Delete"),
        "Return" => Some("Enter"),
        "Left" => Some("ArrowLeft"),
        "Right" => Some("ArrowRight"),
        "Up" => Some("ArrowUp"),
        "Down" => Some("ArrowDown"),
        " " => Some("Space"),
        "Ctrl" => Some("Control"),
        "Cmd" => Some("Meta"),
        "Windows" => Some("Meta"),
        _ => None,
    }
}

/// An alias entry: every alternate collapses onto `canonical`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Alias {
    canonical: String,
    alternates: BTreeSet<String>,
}

/// Normalizes raw key names using the static synonym table and a dynamic
/// alias table.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    /// Alias entries in insertion order. When two entries claim the same
    /// alternate, the earlier one wins.
    aliases: Vec<Alias>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `alternates` as alternate spellings of `canonical`.
    ///
    /// Both sides are lowercased. Calling this again for the same canonical
    /// key replaces its previous alternates.
    pub fn add_alias<I, S>(&mut self, canonical: &str, alternates: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let canonical = canonical.to_lowercase();
        let alternates: BTreeSet<String> = alternates
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .collect();

        tracing::debug!(
            "Alias {} <- {}",
            canonical,
            alternates.iter().cloned().collect::<Vec<_>>().join(", ")
        );

        match self.aliases.iter_mut().find(|a| a.canonical == canonical) {
            Some(existing) => existing.alternates = alternates,
            None => self.aliases.push(Alias {
                canonical,
                alternates,
            }),
        }
    }

    /// Number of registered alias entries.
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// Drop every alias entry.
    pub fn clear(&mut self) {
        self.aliases.clear();
    }

    /// Canonical form of a single raw key identifier.
    pub fn normalize_key(&self, raw: &str) -> String {
        let key = standard_key_name(raw).unwrap_or(raw).to_lowercase();

        self.aliases
            .iter()
            .find(|alias| alias.alternates.contains(&key))
            .map(|alias| alias.canonical.clone())
            .unwrap_or(key)
    }

    /// Normalize every member of a raw key set, merging duplicates.
    pub fn normalize_combo<I, S>(&self, keys: I) -> Combo
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter()
            .map(|k| self.normalize_key(k.as_ref()))
            .collect()
    }
}
