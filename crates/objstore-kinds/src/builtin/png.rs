use super::PNG;
use crate::builder::SummaryBuilder;
use crate::error::{KindError, KindResult};
use crate::info::KindInfo;
use crate::summary::ObjectSummary;

const SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";
/// Signature, chunk length, `IHDR`, width, height.
const HEADER_LEN: usize = 24;

pub fn info() -> KindInfo {
    KindInfo::new(PNG, "PNG")
        .with_description("PNG image file")
        .raw("image/png", "png")
}

/// Validates the PNG signature and reports the image dimensions.
pub struct PngBuilder;

impl SummaryBuilder for PngBuilder {
    fn build(&self, uid: &str, body: &[u8]) -> KindResult<(ObjectSummary, Vec<u8>)> {
        if body.len() < HEADER_LEN || &body[..8] != SIGNATURE {
            return Err(KindError::invalid_body(PNG, "missing PNG signature"));
        }
        if &body[12..16] != b"IHDR" {
            return Err(KindError::invalid_body(PNG, "first chunk is not IHDR"));
        }
        let width = u32::from_be_bytes([body[16], body[17], body[18], body[19]]);
        let height = u32::from_be_bytes([body[20], body[21], body[22], body[23]]);

        let mut summary = ObjectSummary::new(uid, PNG);
        summary.set_name(uid);
        summary.set_field("width", width);
        summary.set_field("height", height);
        Ok((summary, body.to_vec()))
    }
}
