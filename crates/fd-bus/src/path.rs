//! Property path syntax.

use crate::error::{BusError, BusResult};

/// Validate a slash-delimited property path.
///
/// A path is one or more non-empty segments separated by `/`. Segments may
/// contain ASCII letters, digits, `_`, `-`, `.` and index brackets such as
/// `engine[0]`.
pub fn validate_path(path: &str) -> BusResult<()> {
    if path.is_empty() {
        return Err(invalid(path, "empty path"));
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err(invalid(path, "leading or trailing slash"));
    }
    for segment in path.split('/') {
        if segment.is_empty() {
            return Err(invalid(path, "empty segment"));
        }
        let ok = segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '[' | ']'));
        if !ok {
            return Err(invalid(path, "illegal character"));
        }
    }
    Ok(())
}

/// True when `path` lies under `prefix` on a segment boundary.
pub(crate) fn is_under(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    let prefix = prefix.trim_end_matches('/');
    path == prefix
        || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}

fn invalid(path: &str, reason: &'static str) -> BusError {
    BusError::InvalidPath {
        path: path.to_string(),
        reason,
    }
}
