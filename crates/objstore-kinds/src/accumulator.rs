//! Deterministic collection of references discovered during summarization.

use std::collections::BTreeMap;

use crate::summary::ObjectReference;

/// Collects references, deduplicating by `kind/type/uid`.
///
/// [`get`](Self::get) returns references sorted by that composite key, so
/// the output never depends on the order in which a builder discovered them.
/// Re-summarizing unchanged content therefore yields identical reference
/// lists.
#[derive(Debug, Default, Clone)]
pub struct ReferenceAccumulator {
    refs: BTreeMap<String, ObjectReference>,
}

impl ReferenceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reference. Duplicates are ignored.
    pub fn add(&mut self, kind: &str, ref_type: &str, uid: &str) {
        let reference = ObjectReference::new(kind, ref_type, uid);
        self.refs
            .entry(reference.composite_key())
            .or_insert(reference);
    }

    /// Merge every reference from `other`.
    pub fn extend(&mut self, other: &[ObjectReference]) {
        for r in other {
            self.add(&r.kind, &r.ref_type, &r.uid);
        }
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// All references, sorted by composite key.
    pub fn get(&self) -> Vec<ObjectReference> {
        self.refs.values().cloned().collect()
    }
}
