//! Version numbering.
//!
//! Versions are strings. Normally they are decimal counters starting at
//! `"1"`; a current version that is not numeric (for example one imported
//! from another system) is followed by the current time in milliseconds.

use crate::error::{StoreError, StoreResult};

/// The first version of a new (or history-cleared) object.
pub(crate) const FIRST_VERSION: &str = "1";

/// Pick the version a write will create.
///
/// `current` is the object's current version, if it exists. `requested` is
/// an explicit version from the caller; it must be numeric and strictly
/// greater than the current one.
pub(crate) fn next_version(current: Option<&str>, requested: Option<&str>, now_ms: i64) -> StoreResult<String> {
    if let Some(requested) = requested {
        let wanted: u64 = requested
            .parse()
            .map_err(|_| StoreError::InvalidRequest(format!("version must be numeric: {requested:?}")))?;
        if let Some(current) = current.and_then(|c| c.parse::<u64>().ok()) {
            if wanted <= current {
                return Err(StoreError::InvalidRequest(format!(
                    "version {wanted} must be greater than current version {current}"
                )));
            }
        }
        return Ok(wanted.to_string());
    }

    Ok(match current {
        None => FIRST_VERSION.to_string(),
        Some(current) => match current.parse::<u64>() {
            Ok(n) => n
                .checked_add(1)
                .ok_or_else(|| StoreError::InvalidRequest(format!("version {n} cannot be incremented")))?
                .to_string(),
            Err(_) => now_ms.to_string(),
        },
    })
}

/// Returns `true` if the caller's expected version matches the current one.
pub(crate) fn matches_previous(expected: Option<&str>, current: &str) -> bool {
    expected.map_or(true, |expected| expected == current)
}

/// Numeric sort key for history ordering; non-numeric versions sort first.
pub(crate) fn sort_key(version: &str) -> u64 {
    version.parse().unwrap_or(0)
}
