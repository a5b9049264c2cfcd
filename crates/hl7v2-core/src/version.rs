//! HL7 v2.x version list and ordering

use std::cmp::Ordering;

/// Versions known to this library, oldest first
pub const SUPPORTED_VERSIONS: [&str; 9] = ["2.1", "2.2", "2.3", "2.4", "2.5", "2.6", "2.7", "2.8", "2.9"];

/// Version assumed when nothing better is known
pub const DEFAULT_VERSION: &str = "2.5";

#[inline]
pub fn is_known_version(version: &str) -> bool {
    SUPPORTED_VERSIONS.contains(&version)
}

fn position(version: &str) -> Option<usize> {
    SUPPORTED_VERSIONS.iter().position(|v| *v == version)
}

/// Order two versions. Unknown versions compare equal to everything.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (position(a), position(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => Ordering::Equal,
    }
}

/// Is `version` within `[min, max]` (either bound optional)
pub fn is_version_in_range(version: &str, min: Option<&str>, max: Option<&str>) -> bool {
    if !is_known_version(version) {
        return false;
    }
    let above_min = min.map_or(true, |m| compare_versions(version, m) != Ordering::Less);
    let below_max = max.map_or(true, |m| compare_versions(version, m) != Ordering::Greater);
    above_min && below_max
}
