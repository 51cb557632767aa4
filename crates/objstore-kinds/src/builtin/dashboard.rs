//! Dashboard summaries.
//!
//! Extracts title, description and tags, one nested summary per panel
//! (including panels inside collapsed rows), and references to every
//! datasource and panel plugin the dashboard uses.

use serde_json::{Map, Value};

use super::{normalize, parse_object, str_field, DASHBOARD, REF_DATASOURCE, REF_PLUGIN};
use crate::accumulator::ReferenceAccumulator;
use crate::builder::SummaryBuilder;
use crate::error::KindResult;
use crate::info::KindInfo;
use crate::summary::ObjectSummary;

/// Kind of the nested per-panel summaries.
const PANEL: &str = "panel";
/// Datasource uid meaning "each query picks its own datasource".
const MIXED_DATASOURCE: &str = "-- Mixed --";

pub fn info() -> KindInfo {
    KindInfo::new(DASHBOARD, "Dashboard")
        .with_description("Define a dashboard layout")
        .json()
}

pub struct DashboardBuilder;

impl SummaryBuilder for DashboardBuilder {
    fn build(&self, uid: &str, body: &[u8]) -> KindResult<(ObjectSummary, Vec<u8>)> {
        let dash = parse_object(DASHBOARD, body)?;

        let mut summary = ObjectSummary::new(uid, DASHBOARD);
        summary.set_name(str_field(&dash, "title"));
        summary.description = str_field(&dash, "description").to_string();

        if let Some(tags) = dash.get("tags").and_then(Value::as_array) {
            for tag in tags.iter().filter_map(Value::as_str) {
                summary.add_tag(tag);
            }
        }
        if let Some(version) = dash.get("schemaVersion") {
            summary.set_field("schemaVersion", version.clone());
        }

        let mut refs = ReferenceAccumulator::new();
        let mut panels = Vec::new();
        if let Some(list) = dash.get("panels").and_then(Value::as_array) {
            collect_panels(list, &mut panels);
        }
        for panel in &panels {
            let nested = panel_summary(uid, panel);
            refs.extend(&nested.references);
            summary.nested.push(nested);
        }
        summary.set_field("panelCount", panels.len() as u64);

        if let Some(vars) = dash
            .get("templating")
            .and_then(|t| t.get("list"))
            .and_then(Value::as_array)
        {
            for var in vars.iter().filter(|v| v.get("type").and_then(Value::as_str) == Some("query")) {
                add_datasource(&mut refs, var.get("datasource"));
            }
        }

        summary.references = refs.get();
        Ok((summary, normalize(&dash)?))
    }
}

/// Flatten panels, descending into rows that carry their own `panels`.
fn collect_panels<'a>(list: &'a [Value], out: &mut Vec<&'a Map<String, Value>>) {
    for panel in list.iter().filter_map(Value::as_object) {
        if let Some(children) = panel.get("panels").and_then(Value::as_array) {
            collect_panels(children, out);
        }
        if str_field(panel, "type") != "row" {
            out.push(panel);
        }
    }
}

fn panel_summary(dashboard_uid: &str, panel: &Map<String, Value>) -> ObjectSummary {
    let id = panel.get("id").map(render_id).unwrap_or_default();
    let mut summary = ObjectSummary::new(format!("{dashboard_uid}#{id}"), PANEL);
    summary.set_name(str_field(panel, "title"));
    summary.description = str_field(panel, "description").to_string();

    let mut refs = ReferenceAccumulator::new();
    let panel_type = str_field(panel, "type");
    if !panel_type.is_empty() {
        summary.set_field("type", panel_type);
        refs.add(REF_PLUGIN, PANEL, panel_type);
    }

    let targets = panel
        .get("targets")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let panel_ds = panel.get("datasource");
    let mixed = panel_ds
        .and_then(|ds| ds.get("uid"))
        .and_then(Value::as_str)
        == Some(MIXED_DATASOURCE)
        || panel_ds.and_then(Value::as_str) == Some(MIXED_DATASOURCE);

    if !mixed && (panel_ds.is_some_and(|ds| !ds.is_null()) || !targets.is_empty()) {
        add_datasource(&mut refs, panel_ds);
    }
    for target in targets {
        if let Some(ds) = target.get("datasource") {
            if !ds.is_null() {
                add_datasource(&mut refs, Some(ds));
            }
        }
    }

    summary.references = refs.get();
    summary
}

/// Add a datasource reference from either the legacy string form (a name)
/// or the `{type, uid}` object form. A missing datasource means "default".
fn add_datasource(refs: &mut ReferenceAccumulator, ds: Option<&Value>) {
    match ds {
        None | Some(Value::Null) => refs.add(REF_DATASOURCE, "", ""),
        Some(Value::String(name)) => {
            // template variables are resolved at render time
            if !name.starts_with('$') && name != MIXED_DATASOURCE {
                refs.add(REF_DATASOURCE, "", name);
            }
        }
        Some(Value::Object(obj)) => {
            let uid = str_field(obj, "uid");
            if uid.starts_with('$') || uid == MIXED_DATASOURCE {
                return;
            }
            refs.add(REF_DATASOURCE, str_field(obj, "type"), uid);
        }
        Some(_) => {}
    }
}

fn render_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
