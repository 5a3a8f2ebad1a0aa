//! Nested error trees collected from a model.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    path::{Key, Path},
    validation::ValidationError,
};

/// Validation errors of a node and its descendants, keyed like the value tree.
///
/// A container can carry its own error next to errors of its children, so both
/// stay addressable: the `friends` array may say "Please name at least three
/// friends." while `friends[0].name` says "What is your friend's name?".
///
/// Subtrees without any error are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorTree {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ValidationError>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<Key, ErrorTree>,
}

impl ErrorTree {
    pub fn new(error: Option<ValidationError>) -> Self {
        Self {
            error,
            children: BTreeMap::new(),
        }
    }

    /// True when neither this node nor any descendant has an error.
    pub fn is_empty(&self) -> bool {
        self.error.is_none() && self.children.values().all(ErrorTree::is_empty)
    }

    /// Adds a child subtree, dropping it if it holds no errors.
    pub fn insert(&mut self, key: Key, child: ErrorTree) {
        if !child.is_empty() {
            self.children.insert(key, child);
        }
    }

    /// Returns the subtree at `path`.
    pub fn get(&self, path: &[Key]) -> Option<&ErrorTree> {
        path.iter()
            .try_fold(self, |tree, key| tree.children.get(key))
    }

    /// Returns the error stored exactly at `path`.
    pub fn error_at(&self, path: &[Key]) -> Option<&ValidationError> {
        self.get(path).and_then(|tree| tree.error.as_ref())
    }

    /// Total number of errors in the tree.
    pub fn count(&self) -> usize {
        usize::from(self.error.is_some()) + self.children.values().map(ErrorTree::count).sum::<usize>()
    }

    /// All errors with their paths, depth first, parents before children.
    pub fn flatten(&self) -> Vec<(Path, &ValidationError)> {
        let mut out = Vec::new();
        self.collect(Path::new(), &mut out);
        out
    }

    fn collect<'a>(&'a self, path: Path, out: &mut Vec<(Path, &'a ValidationError)>) {
        if let Some(error) = &self.error {
            out.push((path.clone(), error));
        }
        for (key, child) in &self.children {
            child.collect(path.child(key), out);
        }
    }
}
