//! Resource names and their canonical object ids.
//!
//! A [`Grn`] names one object: `(tenant_id, kind, uid)`. Its OID is the
//! string `"{tenant_id}/{kind}/{uid}"`, used as the physical primary key by
//! every storage engine. [`route_from_key`] is the inverse of [`Grn::to_oid`].

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::GrnError;

/// Separator between OID segments.
const SEPARATOR: char = '/';

/// Resource name of a stored object.
///
/// Identity is `(tenant_id, kind, uid)`; `scope` is carried along for
/// callers but never participates in equality or hashing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Grn {
    pub tenant_id: i64,
    pub kind: String,
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Grn {
    pub fn new(tenant_id: i64, kind: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            tenant_id,
            kind: kind.into(),
            uid: uid.into(),
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Returns `true` if every required field is present.
    ///
    /// The kind may not contain `/`; the uid may, since it is always the last
    /// OID segment.
    pub fn is_valid(&self) -> bool {
        self.tenant_id > 0
            && !self.kind.is_empty()
            && !self.kind.contains(SEPARATOR)
            && !self.uid.is_empty()
    }

    /// Field-wise equality that is `false` when either side is incomplete.
    pub fn equals(&self, other: &Grn) -> bool {
        self.is_valid() && other.is_valid() && self == other
    }

    /// Canonical storage key: `"{tenant_id}/{kind}/{uid}"`.
    pub fn to_oid(&self) -> String {
        format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.tenant_id, self.kind, self.uid
        )
    }
}

impl PartialEq for Grn {
    fn eq(&self, other: &Self) -> bool {
        self.tenant_id == other.tenant_id && self.kind == other.kind && self.uid == other.uid
    }
}

impl Eq for Grn {}

impl Hash for Grn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tenant_id.hash(state);
        self.kind.hash(state);
        self.uid.hash(state);
    }
}

impl fmt::Display for Grn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grn:{}", self.to_oid())
    }
}

/// Parse a canonical OID (`"{tenant}/{kind}/{uid}"`) back into a [`Grn`].
pub fn route_from_key(key: &str) -> Result<Grn, GrnError> {
    let mut parts = key.splitn(3, SEPARATOR);

    let tenant = match parts.next() {
        Some(segment) if !segment.is_empty() => segment,
        _ => return Err(GrnError::MissingTenant(key.to_string())),
    };
    let tenant_id: i64 = tenant.parse().map_err(|_| GrnError::InvalidTenant {
        key: key.to_string(),
        segment: tenant.to_string(),
    })?;

    let kind = match parts.next() {
        Some(segment) if !segment.is_empty() => segment,
        _ => return Err(GrnError::MissingKind(key.to_string())),
    };

    let uid = match parts.next() {
        Some(segment) if !segment.is_empty() => segment,
        _ => return Err(GrnError::MissingUid(key.to_string())),
    };

    Ok(Grn::new(tenant_id, kind, uid))
}
