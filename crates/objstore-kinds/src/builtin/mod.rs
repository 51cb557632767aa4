//! Built-in kinds.
//!
//! JSON kinds normalize their body to canonical JSON (sorted keys, no
//! insignificant whitespace) so that formatting-only edits hash to the same
//! etag. Raw kinds validate and pass bytes through untouched.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{KindError, KindResult};
use crate::registry::KindRegistry;

pub mod dashboard;
pub mod dummy;
pub mod folder;
pub mod jsonobj;
pub mod playlist;
pub mod png;
pub mod svg;

pub const DASHBOARD: &str = "dashboard";
pub const DUMMY: &str = "dummy";
pub const FOLDER: &str = "folder";
pub const JSON_OBJECT: &str = "jsonobj";
pub const PLAYLIST: &str = "playlist";
pub const PNG: &str = "png";
pub const SVG: &str = "svg";

/// Reference kind for datasources.
pub const REF_DATASOURCE: &str = "ds";
/// Reference kind for plugins.
pub const REF_PLUGIN: &str = "plugin";
/// Reference kind for tags (an external concept, never resolved to an object).
pub const REF_TAG: &str = "tag";

/// Register every built-in kind.
pub fn register_all(registry: &KindRegistry) -> KindResult<()> {
    registry.register(dashboard::info(), Arc::new(dashboard::DashboardBuilder))?;
    registry.register(dummy::info(), Arc::new(dummy::DummyBuilder))?;
    registry.register(folder::info(), Arc::new(folder::FolderBuilder))?;
    registry.register(jsonobj::info(), Arc::new(jsonobj::JsonObjectBuilder))?;
    registry.register(playlist::info(), Arc::new(playlist::PlaylistBuilder))?;
    registry.register(png::info(), Arc::new(png::PngBuilder))?;
    registry.register(svg::info(), Arc::new(svg::SvgBuilder))?;
    Ok(())
}

/// Parse `body` as a JSON object.
pub(crate) fn parse_object(kind: &str, body: &[u8]) -> KindResult<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(KindError::invalid_body(kind, "expected a JSON object")),
        Err(e) => Err(KindError::invalid_body(kind, e.to_string())),
    }
}

/// Canonical JSON encoding of an object.
pub(crate) fn normalize(map: &Map<String, Value>) -> KindResult<Vec<u8>> {
    serde_json::to_vec(map).map_err(|e| KindError::Serialization(e.to_string()))
}

pub(crate) fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or_default()
}
