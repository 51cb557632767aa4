//! Playlist summaries: a name, an interval, and references to the
//! dashboards (by uid) and tags the playlist cycles through.

use serde::Deserialize;
use serde_json::json;

use super::{normalize, parse_object, DASHBOARD, PLAYLIST, REF_TAG};
use crate::accumulator::ReferenceAccumulator;
use crate::builder::SummaryBuilder;
use crate::error::{KindError, KindResult};
use crate::info::KindInfo;
use crate::summary::{ObjectErrorInfo, ObjectSummary};

pub fn info() -> KindInfo {
    KindInfo::new(PLAYLIST, "Playlist")
        .with_description("Cycle through a collection of dashboards automatically")
        .json()
}

#[derive(Debug, Deserialize)]
struct Playlist {
    name: String,
    #[serde(default)]
    interval: String,
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(rename = "type")]
    item_type: String,
    value: String,
}

pub struct PlaylistBuilder;

impl SummaryBuilder for PlaylistBuilder {
    fn build(&self, uid: &str, body: &[u8]) -> KindResult<(ObjectSummary, Vec<u8>)> {
        let raw = parse_object(PLAYLIST, body)?;
        let playlist: Playlist = serde_json::from_value(raw.clone().into())
            .map_err(|e| KindError::invalid_body(PLAYLIST, e.to_string()))?;

        let mut summary = ObjectSummary::new(uid, PLAYLIST);
        summary.set_name(&playlist.name);
        if !playlist.interval.is_empty() {
            summary.set_field("interval", playlist.interval.as_str());
        }
        summary.set_field("itemCount", playlist.items.len() as u64);

        let mut refs = ReferenceAccumulator::new();
        let mut unknown = Vec::new();
        for item in &playlist.items {
            match item.item_type.as_str() {
                "dashboard_by_uid" => refs.add(DASHBOARD, "", &item.value),
                "dashboard_by_tag" => refs.add(REF_TAG, "", &item.value),
                other => unknown.push(other.to_string()),
            }
        }
        if !unknown.is_empty() {
            summary.error = Some(ObjectErrorInfo {
                code: 400,
                message: "unsupported playlist item type".into(),
                details: Some(json!({ "types": unknown })),
            });
        }
        summary.references = refs.get();

        Ok((summary, normalize(&raw)?))
    }
}
