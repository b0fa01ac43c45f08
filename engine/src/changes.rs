//! Queries over a computed set of change paths.
//!
//! [`AttributeChanges`] answers "did anything named X change" and "did list
//! X grow or shrink", and expands changed trigger attributes into the set of
//! attributes that must stay pending during a merge.

use crate::path;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Trigger attribute name -> attributes whose cached value a trigger change invalidates.
pub type DependencyMap = BTreeMap<String, Vec<String>>;

/// Field names the merge engine must leave pending.
pub type RetainSet = BTreeSet<String>;

/// An ordered list of change paths produced by [`crate::diff`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeChanges {
    changes: Vec<String>,
}

impl AttributeChanges {
    pub fn new(changes: Vec<String>) -> Self {
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.changes
    }

    /// Exact membership of a raw change path.
    pub fn contains(&self, path: &str) -> bool {
        self.changes.iter().any(|c| c == path)
    }

    /// Index of changed attributes keyed by bare leaf name.
    ///
    /// `replication_specs[0].zone_name` contributes `zone_name`,
    /// `replication_specs[0]` contributes `replication_specs`.
    pub fn leaf_changes(&self) -> BTreeMap<String, bool> {
        self.changes
            .iter()
            .map(|c| (path::bare_name(c).to_string(), true))
            .collect()
    }

    /// Whether an attribute with this bare name changed anywhere in the tree.
    ///
    /// Two nested fields sharing a name are indistinguishable here:
    /// `config.name` and `settings.name` both answer for `name`.
    pub fn attribute_changed(&self, name: &str) -> bool {
        self.changes.iter().any(|c| path::bare_name(c) == name)
    }

    /// Whether slot `name[index]` changed in place.
    ///
    /// Insertions and removals (`name[+i]`, `name[-i]`) do not count.
    pub fn list_index_changed(&self, name: &str, index: usize) -> bool {
        self.contains(&path::index(name, index))
    }

    /// Whether a list with this bare name gained or lost elements, at any depth.
    pub fn list_len_changes(&self, name: &str) -> bool {
        let added = format!("{}[+", name);
        let removed = format!("{}[-", name);
        self.changes.iter().any(|c| {
            let segment = path::last_segment(c);
            segment.starts_with(&added) || segment.starts_with(&removed)
        })
    }

    /// Whether the list at the fully qualified `full_path` gained or lost elements.
    pub fn nested_list_len_changes(&self, full_path: &str) -> bool {
        let added = format!("{}[+", full_path);
        let removed = format!("{}[-", full_path);
        self.changes
            .iter()
            .any(|c| c.starts_with(&added) || c.starts_with(&removed))
    }

    /// Whether some list element enclosing `path` was removed.
    pub fn parent_removed(&self, path: &str) -> bool {
        let mut ancestor = path::parent(path);
        while let Some(current) = ancestor {
            if let Some(marker) = path::as_removed(current) {
                if self.contains(&marker) {
                    return true;
                }
            }
            ancestor = path::parent(current);
        }
        false
    }

    /// Attributes that must stay pending given which triggers changed.
    ///
    /// For every trigger that changed, the trigger itself and each of its
    /// affected attributes join the set.
    pub fn keep_pending(&self, dependencies: &DependencyMap) -> RetainSet {
        let leaves = self.leaf_changes();
        let mut retain = RetainSet::new();
        for (trigger, affected) in dependencies {
            if leaves.contains_key(trigger) {
                retain.insert(trigger.clone());
                retain.extend(affected.iter().cloned());
            }
        }
        retain
    }
}

impl From<Vec<String>> for AttributeChanges {
    fn from(changes: Vec<String>) -> Self {
        Self::new(changes)
    }
}

impl From<Vec<&str>> for AttributeChanges {
    fn from(changes: Vec<&str>) -> Self {
        Self::new(changes.into_iter().map(String::from).collect())
    }
}

impl fmt::Display for AttributeChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.changes.join("\n"))
    }
}

/// Build a [`DependencyMap`] from string literals.
pub fn dependency_map<'a>(
    entries: impl IntoIterator<Item = (&'a str, &'a [&'a str])>,
) -> DependencyMap {
    entries
        .into_iter()
        .map(|(trigger, affected)| {
            (
                trigger.to_string(),
                affected.iter().map(|a| a.to_string()).collect(),
            )
        })
        .collect()
}
