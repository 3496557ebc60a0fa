//! Sequence matching
//!
//! Registered sequences are stored in a trie whose edges are combo labels
//! (see [`Combo::label`]). A node reached by a complete registered sequence is
//! a [`TrieNode::Terminal`] carrying that sequence's callback; every other node
//! is [`TrieNode::Internal`].
//!
//! On every buffer update each suffix of the rolling buffer is walked from the
//! root, oldest start first. A suffix matches when it is consumed completely
//! and ends on a terminal node. Buffer entries are never consumed, so one
//! combo can take part in several matches in the same pass.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::combo::Combo;

/// A zero-argument action invoked when a sequence matches.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

type Children = HashMap<String, TrieNode>;

/// A trie node.
pub enum TrieNode {
    /// A prefix of one or more registered sequences
    Internal { children: Children },
    /// The end of a registered sequence (possibly also a prefix of longer ones)
    Terminal { children: Children, callback: Callback },
}

impl Default for TrieNode {
    fn default() -> Self {
        TrieNode::Internal {
            children: HashMap::new(),
        }
    }
}

impl TrieNode {
    pub fn children(&self) -> &Children {
        match self {
            TrieNode::Internal { children } | TrieNode::Terminal { children, .. } => children,
        }
    }

    fn children_mut(&mut self) -> &mut Children {
        match self {
            TrieNode::Internal { children } | TrieNode::Terminal { children, .. } => children,
        }
    }

    pub fn child(&self, label: &str) -> Option<&TrieNode> {
        self.children().get(label)
    }

    pub fn callback(&self) -> Option<&Callback> {
        match self {
            TrieNode::Internal { .. } => None,
            TrieNode::Terminal { callback, .. } => Some(callback),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TrieNode::Terminal { .. })
    }

    /// Turn this node into a terminal carrying `callback`, keeping its children.
    /// An existing callback is replaced.
    fn set_callback(&mut self, callback: Callback) {
        let children = std::mem::take(self.children_mut());
        *self = TrieNode::Terminal { children, callback };
    }
}

impl fmt::Debug for TrieNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_terminal() { "Terminal" } else { "Internal" };
        f.debug_struct(kind)
            .field("children", self.children())
            .finish()
    }
}

/// Trie of registered sequences.
#[derive(Debug, Default)]
pub struct SequenceMatcher {
    root: TrieNode,
    max_sequence_length: usize,
}

impl SequenceMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of the longest registered sequence.
    pub fn max_sequence_length(&self) -> usize {
        self.max_sequence_length
    }

    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    /// Register a sequence of already-normalized combos.
    ///
    /// Empty sequences are ignored and `false` is returned. Registering the
    /// same sequence again replaces its callback.
    pub fn register(&mut self, sequence: &[Combo], callback: Callback) -> bool {
        if sequence.is_empty() {
            return false;
        }
        self.max_sequence_length = self.max_sequence_length.max(sequence.len());

        let mut node = &mut self.root;
        for combo in sequence {
            node = node.children_mut().entry(combo.label()).or_default();
        }
        if node.is_terminal() {
            tracing::debug!("Replacing callback for {}", format_sequence(sequence));
        }
        node.set_callback(callback);

        true
    }

    /// Callbacks of every registered sequence that matches a suffix of
    /// `buffer`, in ascending order of start offset.
    pub fn check(&self, buffer: &VecDeque<Combo>) -> Vec<Callback> {
        let labels: Vec<String> = buffer.iter().map(Combo::label).collect();
        let mut matched = Vec::new();

        for start in 0..labels.len() {
            let mut node = &self.root;
            let mut complete = true;

            for label in &labels[start..] {
                match node.child(label) {
                    Some(child) => node = child,
                    None => {
                        complete = false;
                        break;
                    }
                }
            }

            if !complete {
                continue;
            }
            if let Some(callback) = node.callback() {
                tracing::debug!("Matched {}", labels[start..].join(" "));
                matched.push(Arc::clone(callback));
            }
        }

        matched
    }

    /// Remove every registered sequence.
    pub fn clear(&mut self) {
        self.root = TrieNode::default();
        self.max_sequence_length = 0;
    }
}

fn format_sequence(sequence: &[Combo]) -> String {
    sequence
        .iter()
        .map(Combo::label)
        .collect::<Vec<_>>()
        .join(" ")
}
