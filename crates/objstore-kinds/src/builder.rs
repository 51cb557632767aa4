use crate::error::KindResult;
use crate::summary::ObjectSummary;

/// Derives a summary and a normalized body from raw object bytes.
///
/// Implementations must be pure functions of `body` (and of `uid`, which is
/// only copied into the summary). The normalized body is what gets stored and
/// hashed, so equal inputs must always produce byte-identical output.
pub trait SummaryBuilder: Send + Sync {
    fn build(&self, uid: &str, body: &[u8]) -> KindResult<(ObjectSummary, Vec<u8>)>;
}

impl<F> SummaryBuilder for F
where
    F: Fn(&str, &[u8]) -> KindResult<(ObjectSummary, Vec<u8>)> + Send + Sync,
{
    fn build(&self, uid: &str, body: &[u8]) -> KindResult<(ObjectSummary, Vec<u8>)> {
        self(uid, body)
    }
}
