//! Domain-filter matching shared by auth, proxy and certificate entries.
//!
//! Stored entries carry inclusion (and for proxies, exclusion) lists of
//! host names. Matching is case-insensitive and exact.

use std::collections::BTreeSet;

/// Returns true when the filter set admits the given host.
///
/// An empty filter set admits every host.
#[must_use]
pub fn admits_host(filters: &BTreeSet<String>, host: &str) -> bool {
    filters.is_empty() || contains_host(filters, host)
}

/// Returns true when the filter set explicitly lists the given host.
///
/// Unlike [`admits_host`], an empty set matches nothing.
#[must_use]
pub fn contains_host(filters: &BTreeSet<String>, host: &str) -> bool {
    filters.iter().any(|f| f.trim().eq_ignore_ascii_case(host))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_empty_filters_admit_all() {
        assert!(admits_host(&BTreeSet::new(), "api.example.com"));
    }

    #[test]
    fn test_empty_filters_contain_nothing() {
        assert!(!contains_host(&BTreeSet::new(), "api.example.com"));
    }

    #[test]
    fn test_exact_match_case_insensitive() {
        let filters = set(&["API.Example.com"]);
        assert!(admits_host(&filters, "api.example.com"));
        assert!(contains_host(&filters, "api.example.com"));
    }

    #[test]
    fn test_non_matching_host() {
        let filters = set(&["api.example.com"]);
        assert!(!admits_host(&filters, "other.example.com"));
    }
}
