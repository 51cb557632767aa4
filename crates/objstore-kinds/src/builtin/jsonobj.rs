use super::{normalize, parse_object, str_field, JSON_OBJECT};
use crate::builder::SummaryBuilder;
use crate::error::KindResult;
use crate::info::KindInfo;
use crate::summary::ObjectSummary;

pub fn info() -> KindInfo {
    KindInfo::new(JSON_OBJECT, "JSON Object")
        .with_description("Arbitrary JSON object")
        .json()
}

/// Accepts any JSON object; the name is taken from `name` or `title`,
/// falling back to the uid.
pub struct JsonObjectBuilder;

impl SummaryBuilder for JsonObjectBuilder {
    fn build(&self, uid: &str, body: &[u8]) -> KindResult<(ObjectSummary, Vec<u8>)> {
        let obj = parse_object(JSON_OBJECT, body)?;

        let mut summary = ObjectSummary::new(uid, JSON_OBJECT);
        let name = [str_field(&obj, "name"), str_field(&obj, "title")]
            .into_iter()
            .find(|n| !n.is_empty())
            .unwrap_or(uid);
        summary.set_name(name);
        summary.set_field("keys", obj.len() as u64);
        Ok((summary, normalize(&obj)?))
    }
}
