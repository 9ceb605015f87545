//! Dotted version ordering.

use std::cmp::Ordering;

/// Compare dotted versions component by component (e.g. "14.9" < "14.10").
///
/// Empty components (a trailing separator) are ignored. When one version is
/// a prefix of the other, the longer one is greater.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse::<u64>().ok())
            .collect()
    };

    let a_parts = parse(a);
    let b_parts = parse(b);

    for (ap, bp) in a_parts.iter().zip(b_parts.iter()) {
        match ap.cmp(bp) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    a_parts.len().cmp(&b_parts.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_components() {
        assert_eq!(compare_versions("14.9.5", "14.16.2"), Ordering::Less);
        assert_eq!(compare_versions("14.16.2", "14.2.1"), Ordering::Greater);
        assert_eq!(compare_versions("14.29.30037", "14.29.30037"), Ordering::Equal);
    }

    #[test]
    fn test_longer_version_wins_on_shared_prefix() {
        assert_eq!(compare_versions("14.16.27023.1", "14.16.27023"), Ordering::Greater);
        assert_eq!(compare_versions("14", "14.0"), Ordering::Less);
    }

    #[test]
    fn test_trailing_separator_ignored() {
        assert_eq!(compare_versions("14.16.27023.", "14.16.27024"), Ordering::Less);
        assert_eq!(compare_versions("14.16.27023.", "14.16.27023."), Ordering::Equal);
    }

    #[test]
    fn test_sort_descending() {
        let mut toolsets = vec!["14.9.5", "14.16.2", "14.2.1"];
        toolsets.sort_by(|a, b| compare_versions(b, a));
        assert_eq!(toolsets, vec!["14.16.2", "14.9.5", "14.2.1"]);
    }
}
