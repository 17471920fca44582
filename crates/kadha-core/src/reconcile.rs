//! Tag reconciliation.
//!
//! Editing a post's tags converges its current link set `C` to a desired
//! set `D` by removing `C − D` and adding `D − C`. Links in `C ∩ D` are
//! never touched, so rewriting the same set is a no-op.

use std::collections::BTreeSet;

use uuid::Uuid;

/// Minimal set of link mutations turning the current tag set into the desired one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDelta {
    pub to_add: BTreeSet<Uuid>,
    pub to_remove: BTreeSet<Uuid>,
}

impl TagDelta {
    pub fn between(current: &BTreeSet<Uuid>, desired: &BTreeSet<Uuid>) -> Self {
        Self {
            to_add: desired.difference(current).copied().collect(),
            to_remove: current.difference(desired).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Number of link rows written when the delta is applied.
    pub fn writes(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }

    /// Apply the delta to an in-memory link set. Adding an existing link is a no-op.
    pub fn apply(&self, links: &mut BTreeSet<Uuid>) {
        for id in &self.to_remove {
            links.remove(id);
        }
        links.extend(self.to_add.iter().copied());
    }
}
