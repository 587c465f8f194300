#[cfg(test)]
mod tests;

use crate::field::FieldId;
use std::collections::{BTreeMap, BTreeSet};

///
/// ConstraintGraph
///
/// Adjacency from provider fields to the dependent fields whose filters
/// are conditioned on them. Edges are created at form-assembly time and
/// live for the form's lifetime; forms are rebuilt wholesale, so there
/// is no removal API.
///
/// Duplicate registration is preserved as-is: delivery is at-least-once
/// and registration order is kept for determinism.
///

#[derive(Debug, Default)]
pub struct ConstraintGraph {
    edges: BTreeMap<FieldId, Vec<FieldId>>,
}

impl ConstraintGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `dependent` for invalidation whenever `provider` changes.
    pub fn register_dependent(&mut self, provider: FieldId, dependent: FieldId) {
        self.edges.entry(provider).or_default().push(dependent);
    }

    /// Direct dependents of a provider, in registration order.
    #[must_use]
    pub fn dependents_of(&self, provider: FieldId) -> &[FieldId] {
        self.edges.get(&provider).map_or(&[], Vec::as_slice)
    }

    /// Transitive dependents reachable from `provider`, in first-visit
    /// order. The traversal carries a visited set so propagation
    /// terminates even if a cycle was wired by mistake; the provider is
    /// pre-seeded so a cycle back to it never clears the value that just
    /// changed.
    #[must_use]
    pub fn propagation_targets(&self, provider: FieldId) -> Vec<FieldId> {
        let mut visited: BTreeSet<FieldId> = BTreeSet::from([provider]);
        let mut targets = Vec::new();
        let mut frontier: Vec<FieldId> = self.dependents_of(provider).to_vec();

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for dependent in frontier {
                if visited.insert(dependent) {
                    targets.push(dependent);
                    next.extend_from_slice(self.dependents_of(dependent));
                }
            }
            frontier = next;
        }

        targets
    }
}
