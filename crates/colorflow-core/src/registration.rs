//! Registration strings and pattern matching.
//!
//! Filters and connector types identify themselves with a slash-delimited
//! path such as `//colour/icc.lcms2`: a domain segment, then a category
//! segment whose dot-separated keys qualify the entry.
//!
//! A pattern uses the same shape. Each pattern segment is compared to the
//! registration segment at the same position:
//!
//! - `*` or an empty segment matches anything
//! - a plain key must be present among the registration segment's keys
//! - `+key` must be present
//! - `-key` must be absent
//!
//! A pattern with fewer segments than the registration matches on the
//! segments it has.
//!
//! ```rust
//! use colorflow_core::registration::matches;
//!
//! assert!(matches("//colour/icc.lcms2", "//colour/icc"));
//! assert!(matches("//colour/icc.lcms2", "//colour/icc.+lcms2"));
//! assert!(!matches("//colour/icc.lcms2", "//colour/icc.-lcms2"));
//! assert!(matches("//colour/icc.lcms2", "//*/icc"));
//! assert!(!matches("//colour/icc.lcms2", "//imaging/icc"));
//! ```

use crate::{EngineError, EngineResult};

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Returns `true` if `registration` satisfies `pattern`.
pub fn matches(registration: &str, pattern: &str) -> bool {
    let reg: Vec<&str> = segments(registration).collect();

    for (i, pat) in segments(pattern).enumerate() {
        if pat == "*" {
            continue;
        }
        let Some(seg) = reg.get(i) else {
            return false;
        };
        if !segment_matches(seg, pat) {
            return false;
        }
    }
    true
}

fn segment_matches(segment: &str, pattern: &str) -> bool {
    let keys: Vec<&str> = segment.split('.').collect();
    pattern
        .split('.')
        .filter(|k| !k.is_empty())
        .all(|key| match key.as_bytes()[0] {
            b'+' => keys.contains(&&key[1..]),
            b'-' => !keys.contains(&&key[1..]),
            b'*' => true,
            _ => keys.contains(&key),
        })
}

/// Checks that `registration` has the `//<domain>/<category>` shape.
pub fn validate(registration: &str) -> EngineResult<()> {
    let ok = registration.starts_with("//")
        && segments(registration).count() >= 2
        && segments(registration).all(|s| !s.starts_with(['+', '-']) && s != "*");
    if ok {
        Ok(())
    } else {
        Err(EngineError::not_found(format!(
            "malformed registration string `{registration}`"
        )))
    }
}

/// Category key of a registration: the first key of its second segment.
///
/// ```rust
/// use colorflow_core::registration::category;
///
/// assert_eq!(category("//colour/icc.lcms2"), Some("icc"));
/// ```
pub fn category(registration: &str) -> Option<&str> {
    segments(registration)
        .nth(1)
        .and_then(|seg| seg.split('.').next())
}
