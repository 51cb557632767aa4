use super::SVG;
use crate::builder::SummaryBuilder;
use crate::error::{KindError, KindResult};
use crate::info::KindInfo;
use crate::summary::ObjectSummary;

pub fn info() -> KindInfo {
    KindInfo::new(SVG, "SVG")
        .with_description("Scalable vector graphics (SVG)")
        .raw("image/svg+xml", "svg")
}

/// Accepts UTF-8 SVG documents without embedded scripts.
pub struct SvgBuilder;

impl SummaryBuilder for SvgBuilder {
    fn build(&self, uid: &str, body: &[u8]) -> KindResult<(ObjectSummary, Vec<u8>)> {
        let text = std::str::from_utf8(body)
            .map_err(|_| KindError::invalid_body(SVG, "svg must be valid UTF-8"))?;
        let lower = text.to_ascii_lowercase();
        if !lower.contains("<svg") {
            return Err(KindError::invalid_body(SVG, "missing <svg> root element"));
        }
        if lower.contains("<script") {
            return Err(KindError::invalid_body(SVG, "scripts are not allowed in svg"));
        }

        let mut summary = ObjectSummary::new(uid, SVG);
        summary.set_name(uid);
        Ok((summary, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_svg() {
        let body = br#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg"></svg>"#;
        let (summary, out) = SvgBuilder.build("icon.svg", body).unwrap();
        assert_eq!(summary.name, "icon.svg");
        assert_eq!(out, body.to_vec());
    }

    #[test]
    fn rejects_scripts() {
        let body = b"<svg><script>alert(1)</script></svg>";
        assert!(SvgBuilder.build("x", body).is_err());
    }

    #[test]
    fn rejects_non_svg() {
        assert!(SvgBuilder.build("x", b"<html></html>").is_err());
    }
}
