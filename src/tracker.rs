//! Ownership tracker stored in a RedisFleet's finalizer list
//!
//! Every pod the operator creates for a fleet is recorded, by name, as a
//! finalizer on the fleet. The list doubles as a deletion guard: the API
//! server keeps a fleet with a `deletionTimestamp` around until the list is
//! empty, which only happens after teardown has deleted every tracked pod.
//!
//! Finalizers written by other controllers stay untouched. They are
//! recognised by the `domain/name` form required for third-party finalizers,
//! plus the two built-in garbage collector finalizers.

use std::collections::HashSet;

use kube::ResourceExt;

use crate::crd::RedisFleet;

/// Built-in finalizers owned by the Kubernetes garbage collector
const GC_FINALIZERS: [&str; 2] = ["orphan", "foregroundDeletion"];

/// Returns true if `finalizer` names a child pod rather than another controller
pub fn is_child_identifier(finalizer: &str) -> bool {
    !finalizer.contains('/') && !GC_FINALIZERS.contains(&finalizer)
}

/// Name of the pod at 1-based `index` within `fleet_name`
pub fn child_name(fleet_name: &str, index: usize) -> String {
    format!("{}-{}", fleet_name, index)
}

/// Ordered list of child pod names owned by a fleet
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnershipTracker {
    children: Vec<String>,
    foreign: Vec<String>,
}

impl OwnershipTracker {
    /// Read the tracker from a fleet's finalizers
    pub fn from_fleet(fleet: &RedisFleet) -> Self {
        let (children, foreign) = fleet
            .finalizers()
            .iter()
            .cloned()
            .partition(|f| is_child_identifier(f));
        Self { children, foreign }
    }

    /// Tracked child names, oldest first
    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// Number of tracked children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns true if no children are tracked
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns true if `name` is tracked
    pub fn contains(&self, name: &str) -> bool {
        self.children.iter().any(|c| c == name)
    }

    /// Append `name` unless it is already tracked
    ///
    /// Returns true if the tracker changed.
    pub fn track(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.children.push(name.to_string());
        true
    }

    /// Child at 1-based `position`
    pub fn at(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|i| self.children.get(i))
            .map(String::as_str)
    }

    /// Positions of tracked children outside `<fleet_name>-1..=<fleet_name>-<want>`
    ///
    /// Highest position first, so removing them in order keeps the
    /// remaining positions valid.
    pub fn surplus_positions(&self, fleet_name: &str, want: usize) -> Vec<usize> {
        let desired: HashSet<String> = (1..=want).map(|i| child_name(fleet_name, i)).collect();
        (1..=self.children.len())
            .rev()
            .filter(|&position| !desired.contains(&self.children[position - 1]))
            .collect()
    }

    /// Stop tracking the child at 1-based `position`
    pub fn remove_at(&mut self, position: usize) -> Option<String> {
        let index = position.checked_sub(1)?;
        if index < self.children.len() {
            Some(self.children.remove(index))
        } else {
            None
        }
    }

    /// Drop every tracked child
    pub fn clear(&mut self) {
        self.children.clear();
    }

    /// Finalizer list to persist: foreign finalizers first, then children
    pub fn to_finalizers(&self) -> Vec<String> {
        self.foreign
            .iter()
            .chain(self.children.iter())
            .cloned()
            .collect()
    }

    /// Write the tracker back into `fleet`'s metadata
    ///
    /// Returns true if the fleet's finalizers changed.
    pub fn apply_to(&self, fleet: &mut RedisFleet) -> bool {
        let finalizers = self.to_finalizers();
        if fleet.finalizers() == finalizers.as_slice() {
            return false;
        }
        fleet.metadata.finalizers = if finalizers.is_empty() {
            None
        } else {
            Some(finalizers)
        };
        true
    }
}
