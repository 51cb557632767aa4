//! Request and response types shared by every storage engine.

use std::collections::BTreeMap;

use objstore_kinds::{ObjectErrorInfo, ObjectSummary};
use objstore_types::Grn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;
use crate::resolver::StoredReference;

/// Outcome of a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteStatus {
    Error,
    Created,
    Updated,
    Unchanged,
}

/// Where an object was synced from, if it was not authored in the store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectOriginInfo {
    pub source: String,
    #[serde(default)]
    pub key: String,
    /// Milliseconds since epoch at the origin.
    #[serde(default)]
    pub time: i64,
}

/// One stored version of an object. Timestamps are milliseconds since epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawObject {
    pub grn: Grn,
    pub version: String,
    pub created_at: i64,
    pub created_by: String,
    pub updated_at: i64,
    pub updated_by: String,
    #[serde(default)]
    pub folder: String,
    pub size: i64,
    pub etag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "body_base64")]
    pub body: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<ObjectOriginInfo>,
}

impl RawObject {
    pub fn version_info(&self) -> ObjectVersionInfo {
        ObjectVersionInfo {
            version: self.version.clone(),
            updated_at: self.updated_at,
            updated_by: self.updated_by.clone(),
            size: self.size,
            etag: self.etag.clone(),
            comment: self.comment.clone(),
        }
    }
}

/// Metadata of one entry in an object's history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectVersionInfo {
    pub version: String,
    pub updated_at: i64,
    pub updated_by: String,
    pub size: i64,
    pub etag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadObjectRequest {
    pub grn: Grn,
    /// Read a historical version instead of the current one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub with_body: bool,
    #[serde(default)]
    pub with_summary: bool,
}

impl ReadObjectRequest {
    pub fn new(grn: Grn) -> Self {
        Self {
            grn,
            ..Default::default()
        }
    }

    pub fn with_body(mut self) -> Self {
        self.with_body = true;
        self
    }

    pub fn with_summary(mut self) -> Self {
        self.with_summary = true;
        self
    }

    pub fn at_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// `object` is `None` when the object (or requested version) does not exist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadObjectResponse {
    pub object: Option<RawObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ObjectSummary>,
}

impl ReadObjectResponse {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn is_found(&self) -> bool {
        self.object.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReadRequest {
    pub requests: Vec<ReadObjectRequest>,
}

/// One response per request, in request order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReadResponse {
    pub results: Vec<ReadObjectResponse>,
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteObjectRequest {
    pub grn: Grn,
    #[serde(with = "body_base64_required")]
    pub body: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default)]
    pub comment: String,
    /// Fail unless the current version equals this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    /// Explicit version to assign; must be numeric and above the current one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Drop all prior history and start over as a fresh object.
    #[serde(default)]
    pub clear_history: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<ObjectOriginInfo>,
}

impl WriteObjectRequest {
    pub fn new(grn: Grn, body: impl Into<Vec<u8>>) -> Self {
        Self {
            grn,
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_previous_version(mut self, version: impl Into<String>) -> Self {
        self.previous_version = Some(version.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn clearing_history(mut self) -> Self {
        self.clear_history = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteObjectResponse {
    pub grn: Grn,
    pub status: WriteStatus,
    /// Version info of the object after the write (current version when
    /// `UNCHANGED`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<ObjectVersionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ObjectErrorInfo>,
}

impl WriteObjectResponse {
    /// Render a failed write as an `ERROR` response.
    pub fn from_error(grn: Grn, err: &StoreError) -> Self {
        Self {
            grn,
            status: WriteStatus::Error,
            object: None,
            summary_json: None,
            error: Some(err.to_error_info()),
        }
    }

    pub fn version(&self) -> Option<&str> {
        self.object.as_ref().map(|o| o.version.as_str())
    }
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteObjectRequest {
    pub grn: Grn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
}

impl DeleteObjectRequest {
    pub fn new(grn: Grn) -> Self {
        Self {
            grn,
            previous_version: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteObjectResponse {
    /// `true` if a row was actually removed.
    pub ok: bool,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectHistoryRequest {
    pub grn: Grn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl ObjectHistoryRequest {
    pub fn new(grn: Grn) -> Self {
        Self {
            grn,
            ..Default::default()
        }
    }
}

/// Versions, most recent first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectHistoryResponse {
    pub grn: Grn,
    pub versions: Vec<ObjectVersionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Tenant-scoped listing. The tenant comes from the [`StoreContext`](crate::StoreContext).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSearchRequest {
    /// Restrict to these kinds; empty means all kinds.
    #[serde(default)]
    pub kinds: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub with_body: bool,
    #[serde(default)]
    pub with_labels: bool,
    #[serde(default)]
    pub with_fields: bool,
    /// Label filter. Recognized but not supported.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Custom sort. Recognized but not supported.
    #[serde(default)]
    pub sort: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSearchResult {
    pub grn: Grn,
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub folder: String,
    pub size: i64,
    pub updated_at: i64,
    pub updated_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "body_base64")]
    pub body: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ObjectErrorInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSearchResponse {
    pub results: Vec<ObjectSearchResult>,
    /// OID of the first result of the next page; `None` on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// A stored reference whose target could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingReference {
    pub source: Grn,
    pub reference: StoredReference,
}

/// Bodies are opaque bytes; serialized forms carry them as base64.
mod body_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match body {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

mod body_base64_required {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
