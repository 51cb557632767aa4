//! A kind with a fixed, fully populated summary. Used by tests.

use serde_json::json;

use super::{DUMMY, REF_DATASOURCE, REF_PLUGIN};
use crate::accumulator::ReferenceAccumulator;
use crate::builder::SummaryBuilder;
use crate::error::KindResult;
use crate::info::KindInfo;
use crate::summary::{ObjectErrorInfo, ObjectSummary};

pub fn info() -> KindInfo {
    KindInfo::new(DUMMY, "Dummy").with_description("Dummy kind used for testing")
}

pub struct DummyBuilder;

impl SummaryBuilder for DummyBuilder {
    fn build(&self, uid: &str, body: &[u8]) -> KindResult<(ObjectSummary, Vec<u8>)> {
        let mut summary = ObjectSummary::new(uid, DUMMY);
        summary.set_name(format!("Dummy: {uid}"));
        summary.description = format!("Kind: {DUMMY}");
        summary.labels.insert("hello".into(), "world".into());
        summary.add_tag("tag1");
        summary.add_tag("tag2");
        summary.set_field("field1", "a string");
        summary.set_field("field2", 1.224);
        summary.set_field("field4", true);
        summary.error = Some(ObjectErrorInfo {
            code: 10,
            message: "Error message".into(),
            details: Some(json!({ "hello": "world" })),
        });

        let mut nested = ObjectSummary::new(format!("{uid}/a"), DUMMY);
        nested.set_name("Nested A");
        summary.nested.push(nested);

        let mut refs = ReferenceAccumulator::new();
        refs.add(REF_PLUGIN, "panel", "timeseries");
        refs.add(REF_DATASOURCE, "influxdb", "influx-uid");
        summary.references = refs.get();

        Ok((summary, body.to_vec()))
    }
}
