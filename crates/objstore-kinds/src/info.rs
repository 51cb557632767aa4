use serde::{Deserialize, Serialize};

/// Static description of a registered kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindInfo {
    /// Unique kind id, used as the middle segment of an OID.
    pub id: String,
    /// Display name.
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Raw kinds store opaque bytes (images etc.) rather than JSON.
    #[serde(default)]
    pub is_raw: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl KindInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn raw(mut self, mime_type: &str, file_extension: &str) -> Self {
        self.is_raw = true;
        self.mime_type = Some(mime_type.to_string());
        self.file_extension = Some(file_extension.to_string());
        self
    }

    pub fn json(mut self) -> Self {
        self.mime_type = Some("application/json".to_string());
        self.file_extension = Some("json".to_string());
        self
    }
}
