//! Resolution of outbound references against a catalog of known targets.
//!
//! A write stores every reference its summary produced together with the
//! outcome of resolving it. An unresolved reference is not an error: it is
//! stored with `ok = false` and later reported as dangling. Only a resolver
//! that cannot answer at all aborts the write.

use std::collections::{BTreeMap, BTreeSet};

use objstore_kinds::ObjectReference;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reference kind for data sources.
pub const KIND_DATASOURCE: &str = "ds";
/// Reference kind for plugins.
pub const KIND_PLUGIN: &str = "plugin";

/// The resolver could not answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("resolver unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of resolving one reference.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedReference {
    pub ok: bool,
    /// Identifier of the target that was matched.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub warning: String,
    /// When the resolution happened, in milliseconds since epoch.
    pub timestamp: i64,
}

impl ResolvedReference {
    pub fn found(key: impl Into<String>) -> Self {
        Self {
            ok: true,
            key: key.into(),
            warning: String::new(),
            timestamp: now_millis(),
        }
    }

    pub fn missing(warning: impl Into<String>) -> Self {
        Self {
            ok: false,
            key: String::new(),
            warning: warning.into(),
            timestamp: now_millis(),
        }
    }
}

/// A reference as persisted alongside the current version of an object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReference {
    #[serde(flatten)]
    pub reference: ObjectReference,
    pub resolved: ResolvedReference,
}

/// Resolves references discovered during summarization.
pub trait ReferenceResolver: Send + Sync {
    fn resolve(&self, reference: &ObjectReference) -> Result<ResolvedReference, ResolveError>;
}

impl<F> ReferenceResolver for F
where
    F: Fn(&ObjectReference) -> Result<ResolvedReference, ResolveError> + Send + Sync,
{
    fn resolve(&self, reference: &ObjectReference) -> Result<ResolvedReference, ResolveError> {
        self(reference)
    }
}

/// A data source known to the catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasourceEntry {
    #[serde(rename = "type")]
    pub ds_type: String,
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

impl DatasourceEntry {
    pub fn new(ds_type: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            ds_type: ds_type.into(),
            uid: uid.into(),
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// In-memory catalog of data sources and plugins.
///
/// - `ds` references match a data source by uid, then by name. An empty
///   uid means "the default data source"; when a type is given the default
///   must be of that type.
/// - `plugin` references match by plugin id (the reference's uid).
/// - Any other kind resolves to `ok = false`.
#[derive(Clone, Debug, Default)]
pub struct CatalogResolver {
    datasources: BTreeMap<String, DatasourceEntry>,
    plugins: BTreeSet<String>,
}

impl CatalogResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_datasource(mut self, entry: DatasourceEntry) -> Self {
        self.datasources.insert(entry.uid.clone(), entry);
        self
    }

    pub fn with_plugin(mut self, id: impl Into<String>) -> Self {
        self.plugins.insert(id.into());
        self
    }

    fn resolve_datasource(&self, reference: &ObjectReference) -> ResolvedReference {
        if reference.uid.is_empty() {
            let default = self
                .datasources
                .values()
                .find(|ds| ds.is_default && (reference.ref_type.is_empty() || ds.ds_type == reference.ref_type));
            return match default {
                Some(ds) => ResolvedReference::found(&ds.uid),
                None => ResolvedReference::missing("no default data source"),
            };
        }

        let found = self.datasources.get(&reference.uid).or_else(|| {
            self.datasources
                .values()
                .find(|ds| !ds.name.is_empty() && ds.name == reference.uid)
        });
        match found {
            Some(ds) if reference.ref_type.is_empty() || ds.ds_type == reference.ref_type => {
                ResolvedReference::found(&ds.uid)
            }
            Some(ds) => ResolvedReference::missing(format!(
                "data source {} is of type {}, not {}",
                ds.uid, ds.ds_type, reference.ref_type
            )),
            None => ResolvedReference::missing(format!("data source not found: {}", reference.uid)),
        }
    }
}

impl ReferenceResolver for CatalogResolver {
    fn resolve(&self, reference: &ObjectReference) -> Result<ResolvedReference, ResolveError> {
        let resolved = match reference.kind.as_str() {
            KIND_DATASOURCE => self.resolve_datasource(reference),
            KIND_PLUGIN if self.plugins.contains(&reference.uid) => ResolvedReference::found(&reference.uid),
            KIND_PLUGIN => ResolvedReference::missing(format!("plugin not installed: {}", reference.uid)),
            _ => ResolvedReference::missing("unsupported reference kind"),
        };
        Ok(resolved)
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> CatalogResolver {
        CatalogResolver::new()
            .with_datasource(DatasourceEntry::new("prometheus", "P1").named("Prom").as_default())
            .with_datasource(DatasourceEntry::new("influxdb", "influx-uid").named("Influx"))
            .with_plugin("timeseries")
    }

    #[test]
    fn datasource_by_uid() {
        let r = catalog()
            .resolve(&ObjectReference::new("ds", "influxdb", "influx-uid"))
            .unwrap();
        assert!(r.ok);
        assert_eq!(r.key, "influx-uid");
        assert!(r.timestamp > 0);
    }

    #[test]
    fn datasource_by_name() {
        let r = catalog().resolve(&ObjectReference::new("ds", "", "Prom")).unwrap();
        assert!(r.ok);
        assert_eq!(r.key, "P1");
    }

    #[test]
    fn empty_uid_uses_default() {
        let r = catalog().resolve(&ObjectReference::new("ds", "", "")).unwrap();
        assert_eq!(r.key, "P1");

        let r = catalog().resolve(&ObjectReference::new("ds", "influxdb", "")).unwrap();
        assert!(!r.ok);
    }

    #[test]
    fn type_mismatch_is_unresolved() {
        let r = catalog().resolve(&ObjectReference::new("ds", "loki", "P1")).unwrap();
        assert!(!r.ok);
        assert!(r.warning.contains("prometheus"));
    }

    #[test]
    fn plugins_match_by_id() {
        let c = catalog();
        assert!(c.resolve(&ObjectReference::new("plugin", "panel", "timeseries")).unwrap().ok);
        assert!(!c.resolve(&ObjectReference::new("plugin", "panel", "piechart")).unwrap().ok);
    }

    #[test]
    fn unknown_kind_is_unresolved() {
        let r = catalog().resolve(&ObjectReference::new("dashboard", "", "abc")).unwrap();
        assert!(!r.ok);
        assert_eq!(r.warning, "unsupported reference kind");
    }

    #[test]
    fn closures_are_resolvers() {
        let down = |_: &ObjectReference| -> Result<ResolvedReference, ResolveError> {
            Err(ResolveError::Unavailable("catalog offline".into()))
        };
        assert!(down.resolve(&ObjectReference::new("ds", "", "")).is_err());
    }
}
