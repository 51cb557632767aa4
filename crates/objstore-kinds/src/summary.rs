//! Summary model: the searchable metadata derived from an object body.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata derived purely from an object's body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    /// Uid of the summarized object; must equal the caller's uid.
    pub uid: String,
    /// Kind of the summarized object; must equal the caller's kind.
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub slug: String,
    /// Key/value labels. Tags are labels with an empty value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Kind-specific searchable fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
    /// Problem found while summarizing that did not prevent the write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ObjectErrorInfo>,
    /// Summaries of nested items (e.g. dashboard panels).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<ObjectSummary>,
    /// Outbound references, sorted by `kind/type/uid`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ObjectReference>,
}

impl ObjectSummary {
    pub fn new(uid: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Set the display name and derive the slug from it.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.slug = slugify(&self.name);
    }

    /// Add a tag (a label with an empty value).
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.labels.insert(tag.into(), String::new());
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Serialize to the JSON form returned to callers.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A typed, directed edge discovered while summarizing an object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectReference {
    /// Target kind (`ds`, `plugin`, `dashboard`, ...).
    pub kind: String,
    /// Subtype within the kind (datasource type, plugin class, ...).
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub ref_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
}

impl ObjectReference {
    pub fn new(kind: impl Into<String>, ref_type: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ref_type: ref_type.into(),
            uid: uid.into(),
        }
    }

    /// The `kind/type/uid` key used for deduplication and ordering.
    pub fn composite_key(&self) -> String {
        format!("{}/{}/{}", self.kind, self.ref_type, self.uid)
    }
}

/// Structured error attached to a summary or a failed write.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectErrorInfo {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ObjectErrorInfo {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }
}

/// URL-friendly form of a name: lowercase alphanumerics separated by `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}
