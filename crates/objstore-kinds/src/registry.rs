//! Process-wide registry of kinds.
//!
//! The registry is constructed once at startup, populated with the built-in
//! kinds plus any dynamically loaded ones, and then shared by reference with
//! every storage engine. Lookups take a read lock and never block each other;
//! registration takes the write lock. Kinds cannot be unregistered.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::builder::SummaryBuilder;
use crate::builtin;
use crate::error::{KindError, KindResult};
use crate::info::KindInfo;
use crate::summary::ObjectSummary;

struct RegisteredKind {
    info: KindInfo,
    builder: Arc<dyn SummaryBuilder>,
}

/// Concurrency-safe map from kind id to its info and summary builder.
#[derive(Default)]
pub struct KindRegistry {
    kinds: RwLock<BTreeMap<String, RegisteredKind>>,
}

impl KindRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in kind.
    pub fn with_builtins() -> KindResult<Self> {
        let registry = Self::new();
        builtin::register_all(&registry)?;
        Ok(registry)
    }

    /// Register a kind.
    ///
    /// Fails if the id is empty or contains `/`, or if the kind is already
    /// registered. Existing registrations are never overwritten.
    pub fn register(&self, info: KindInfo, builder: Arc<dyn SummaryBuilder>) -> KindResult<()> {
        validate_kind_id(&info.id)?;

        // Entries are immutable once inserted, so a poisoned lock still
        // guards a consistent map.
        let mut kinds = self.kinds.write().unwrap_or_else(PoisonError::into_inner);
        if kinds.contains_key(&info.id) {
            return Err(KindError::AlreadyRegistered(info.id));
        }
        debug!(kind = %info.id, raw = info.is_raw, "registered kind");
        kinds.insert(info.id.clone(), RegisteredKind { info, builder });
        Ok(())
    }

    /// The summary builder for `kind`, if registered.
    pub fn summary_builder(&self, kind: &str) -> Option<Arc<dyn SummaryBuilder>> {
        let kinds = self.kinds.read().unwrap_or_else(PoisonError::into_inner);
        kinds.get(kind).map(|k| Arc::clone(&k.builder))
    }

    /// The info for `kind`.
    pub fn info(&self, kind: &str) -> KindResult<KindInfo> {
        let kinds = self.kinds.read().unwrap_or_else(PoisonError::into_inner);
        kinds
            .get(kind)
            .map(|k| k.info.clone())
            .ok_or_else(|| KindError::UnknownKind(kind.to_string()))
    }

    /// Returns `true` if `kind` is registered.
    pub fn contains(&self, kind: &str) -> bool {
        let kinds = self.kinds.read().unwrap_or_else(PoisonError::into_inner);
        kinds.contains_key(kind)
    }

    /// A copy of every registered kind's info, sorted by id.
    pub fn kinds(&self) -> Vec<KindInfo> {
        let kinds = self.kinds.read().unwrap_or_else(PoisonError::into_inner);
        kinds.values().map(|k| k.info.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the kind's builder and check that the summary names the same
    /// object the caller asked about.
    pub fn summarize(&self, kind: &str, uid: &str, body: &[u8]) -> KindResult<(ObjectSummary, Vec<u8>)> {
        let builder = self
            .summary_builder(kind)
            .ok_or_else(|| KindError::UnknownKind(kind.to_string()))?;

        let (summary, normalized) = builder.build(uid, body)?;
        if summary.uid != uid {
            return Err(KindError::Mismatch {
                field: "uid",
                expected: uid.to_string(),
                actual: summary.uid,
            });
        }
        if summary.kind != kind {
            return Err(KindError::Mismatch {
                field: "kind",
                expected: kind.to_string(),
                actual: summary.kind,
            });
        }
        Ok((summary, normalized))
    }
}

impl std::fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self.kinds().into_iter().map(|k| k.id).collect();
        f.debug_struct("KindRegistry").field("kinds", &ids).finish()
    }
}

fn validate_kind_id(id: &str) -> KindResult<()> {
    if id.is_empty() {
        return Err(KindError::InvalidKindId {
            id: id.to_string(),
            reason: "kind id must not be empty".into(),
        });
    }
    if id.contains('/') || id.chars().any(char::is_whitespace) {
        return Err(KindError::InvalidKindId {
            id: id.to_string(),
            reason: "kind id must not contain '/' or whitespace".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KindResult;

    fn echo_builder(kind: &'static str) -> Arc<dyn SummaryBuilder> {
        Arc::new(move |uid: &str, body: &[u8]| -> KindResult<(ObjectSummary, Vec<u8>)> {
            Ok((ObjectSummary::new(uid, kind), body.to_vec()))
        })
    }

    #[test]
    fn register_and_lookup() {
        let registry = KindRegistry::new();
        registry
            .register(KindInfo::new("note", "Note"), echo_builder("note"))
            .unwrap();

        assert!(registry.contains("note"));
        assert!(registry.summary_builder("note").is_some());
        assert_eq!(registry.info("note").unwrap().name, "Note");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_id_is_rejected() {
        let registry = KindRegistry::new();
        let err = registry
            .register(KindInfo::new("", "Nothing"), echo_builder(""))
            .unwrap_err();
        assert!(matches!(err, KindError::InvalidKindId { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn id_with_separator_is_rejected() {
        let registry = KindRegistry::new();
        let err = registry
            .register(KindInfo::new("a/b", "Bad"), echo_builder("a/b"))
            .unwrap_err();
        assert!(matches!(err, KindError::InvalidKindId { .. }));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = KindRegistry::new();
        registry
            .register(KindInfo::new("note", "Note"), echo_builder("note"))
            .unwrap();
        let err = registry
            .register(KindInfo::new("note", "Other"), echo_builder("note"))
            .unwrap_err();
        assert_eq!(err, KindError::AlreadyRegistered("note".into()));
        // original registration untouched
        assert_eq!(registry.info("note").unwrap().name, "Note");
    }

    #[test]
    fn unknown_kind_lookups() {
        let registry = KindRegistry::new();
        assert!(registry.summary_builder("missing").is_none());
        assert_eq!(
            registry.info("missing").unwrap_err(),
            KindError::UnknownKind("missing".into())
        );
        assert!(matches!(
            registry.summarize("missing", "x", b"{}"),
            Err(KindError::UnknownKind(_))
        ));
    }

    #[test]
    fn kinds_returns_sorted_copy() {
        let registry = KindRegistry::new();
        registry.register(KindInfo::new("zeta", "Z"), echo_builder("zeta")).unwrap();
        registry.register(KindInfo::new("alpha", "A"), echo_builder("alpha")).unwrap();

        let mut kinds = registry.kinds();
        assert_eq!(kinds[0].id, "alpha");
        assert_eq!(kinds[1].id, "zeta");

        kinds.clear();
        assert_eq!(registry.kinds().len(), 2);
    }

    #[test]
    fn summarize_rejects_uid_mismatch() {
        let registry = KindRegistry::new();
        let liar: Arc<dyn SummaryBuilder> = Arc::new(|_uid: &str, body: &[u8]| -> KindResult<(ObjectSummary, Vec<u8>)> {
            Ok((ObjectSummary::new("someone-else", "note"), body.to_vec()))
        });
        registry.register(KindInfo::new("note", "Note"), liar).unwrap();

        let err = registry.summarize("note", "mine", b"{}").unwrap_err();
        assert!(matches!(err, KindError::Mismatch { field: "uid", .. }));
    }

    #[test]
    fn summarize_rejects_kind_mismatch() {
        let registry = KindRegistry::new();
        registry
            .register(KindInfo::new("note", "Note"), echo_builder("other"))
            .unwrap();

        let err = registry.summarize("note", "x", b"{}").unwrap_err();
        assert!(matches!(err, KindError::Mismatch { field: "kind", .. }));
    }

    #[test]
    fn builtins_are_registered() {
        let registry = KindRegistry::with_builtins().unwrap();
        for kind in ["dashboard", "dummy", "folder", "jsonobj", "playlist", "png", "svg"] {
            assert!(registry.contains(kind), "missing builtin {kind}");
        }
        assert!(registry.info("png").unwrap().is_raw);
    }

    #[test]
    fn concurrent_lookups_are_safe() {
        use std::thread;

        let registry = Arc::new(KindRegistry::with_builtins().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let uid = format!("uid-{i}");
                    let (summary, _) = registry.summarize("dummy", &uid, b"{}").unwrap();
                    assert_eq!(summary.uid, uid);
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
    }
}
