//! Numeric ordering of dot-separated version strings.

use std::cmp::Ordering;

/// Leading decimal digits of each segment; a segment without digits counts as `0`.
fn segments(version: &str) -> impl Iterator<Item = u64> + '_ {
    version.trim().split('.').map(|seg| {
        let digits: &str = seg
            .find(|c: char| !c.is_ascii_digit())
            .map_or(seg, |end| &seg[..end]);
        digits.parse::<u64>().unwrap_or(0)
    })
}

/// Compare two versions segment by segment, treating missing trailing segments as `0`.
///
/// Versions that are numerically equal (`3.10` vs `3.10.0`) fall back to comparing the raw
/// strings, so the order is total.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = segments(a);
    let mut right = segments(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (l, r) => {
                let ord = l.unwrap_or(0).cmp(&r.unwrap_or(0));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Descending order, highest version first.
#[must_use]
pub fn compare_versions_desc(a: &str, b: &str) -> Ordering {
    compare_versions(b, a)
}

/// True when `version` equals `prefix` or continues it with a further segment.
#[must_use]
pub fn matches_prefix(version: &str, prefix: &str) -> bool {
    version == prefix
        || version
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::{compare_versions, compare_versions_desc, matches_prefix};
    use std::cmp::Ordering;

    #[test]
    fn orders_numerically_not_lexically() {
        assert_eq!(compare_versions("3.9.0", "3.10.0"), Ordering::Less);
        assert_eq!(compare_versions("10.0.0", "9.99.99"), Ordering::Greater);
        assert_eq!(compare_versions("1.2", "1.2.1"), Ordering::Less);
    }

    #[test]
    fn numerically_equal_versions_tie_break_on_raw_string() {
        assert_eq!(compare_versions("3.10", "3.10.0"), Ordering::Less);
        assert_eq!(compare_versions("3.10.0", "3.10.0"), Ordering::Equal);

        let mut v = vec!["3.10", "2.7.18", "3.10.0", "3.11.2", "3.9.1"];
        v.sort_by(|a, b| compare_versions_desc(a, b));
        assert_eq!(v, vec!["3.11.2", "3.10.0", "3.10", "3.9.1", "2.7.18"]);
    }

    #[test]
    fn non_numeric_segments_count_as_zero() {
        assert_eq!(compare_versions("1.x", "1.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.2rc1", "1.2"), Ordering::Greater);
        assert_eq!(compare_versions("1.x", "1.1"), Ordering::Less);
    }

    #[test]
    fn prefix_match_respects_segment_boundaries() {
        assert!(matches_prefix("3.10.9", "3.10"));
        assert!(matches_prefix("3.10", "3.10"));
        assert!(matches_prefix("3.11.2", "3"));
        assert!(!matches_prefix("3.100.1", "3.10"));
        assert!(!matches_prefix("31.0", "3"));
    }
}
