// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Bundlecast.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Semantic version validation and ordering
//!
//! Thin wrapper around the `semver` crate. Comparison errors are values,
//! never panics - callers holding untrusted input check `is_valid` first.

use std::cmp::Ordering;

use semver::Version;

use crate::error::{CoreError, Result};

/// True iff the string parses as a full semantic version
/// (major.minor.patch with optional pre-release / build metadata).
pub fn is_valid(version: &str) -> bool {
    Version::parse(version).is_ok()
}

/// Parse a version string, reporting `InvalidVersion` on failure.
pub fn parse(version: &str) -> Result<Version> {
    Version::parse(version).map_err(|_| CoreError::InvalidVersion(version.to_owned()))
}

/// Newest-first total order per semver precedence rules. `Less` means `a`
/// sorts before `b` in a descending list, i.e. `a` is the newer version.
pub fn compare_descending(a: &str, b: &str) -> Result<Ordering> {
    Ok(parse(b)?.cmp(&parse(a)?))
}

/// Strict newer-than check: `a` is newer than `b`.
pub fn is_greater_than(a: &str, b: &str) -> Result<bool> {
    Ok(parse(a)? > parse(b)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid() {
        assert!(is_valid("1.0.0"));
        assert!(is_valid("0.2.38"));
        assert!(is_valid("10.20.30"));
        assert!(is_valid("1.0.0-alpha.1"));
        assert!(is_valid("1.0.0+build.5"));
        assert!(is_valid("1.0.0-rc.1+build.5"));
    }

    #[test]
    fn test_is_valid_rejects_malformed() {
        assert!(!is_valid(""));
        assert!(!is_valid("1.0"));
        assert!(!is_valid("1"));
        assert!(!is_valid("1.2.3.4"));
        assert!(!is_valid("a.b.c"));
        assert!(!is_valid("v1.0.0"));
        assert!(!is_valid("1.0.0 "));
    }

    #[test]
    fn test_parse_invalid_reports_error() {
        let err = parse("1.0").unwrap_err();
        assert!(matches!(err, CoreError::InvalidVersion(_)));
    }

    #[test]
    fn test_is_greater_than() {
        assert!(is_greater_than("1.2.0", "1.1.0").unwrap());
        assert!(is_greater_than("1.10.0", "1.9.0").unwrap());
        assert!(is_greater_than("2.0.0", "1.99.99").unwrap());
        assert!(!is_greater_than("1.1.0", "1.1.0").unwrap());
        assert!(!is_greater_than("1.0.9", "1.1.0").unwrap());
    }

    #[test]
    fn test_prerelease_precedence() {
        // A pre-release sorts below its release
        assert!(is_greater_than("1.0.0", "1.0.0-rc.1").unwrap());
        assert!(is_greater_than("1.0.0-beta", "1.0.0-alpha").unwrap());
        assert!(is_greater_than("1.0.0-alpha.2", "1.0.0-alpha.1").unwrap());
        // Build metadata does not affect precedence
        assert!(!is_greater_than("1.0.0+build.2", "1.0.0+build.1").unwrap());
    }

    #[test]
    fn test_compare_descending_orders_newest_first() {
        assert_eq!(compare_descending("1.2.0", "1.1.0").unwrap(), Ordering::Less);
        assert_eq!(
            compare_descending("1.1.0", "1.2.0").unwrap(),
            Ordering::Greater
        );
        assert_eq!(compare_descending("1.1.0", "1.1.0").unwrap(), Ordering::Equal);

        let mut versions = vec!["1.0.0", "1.10.0", "1.2.0", "1.10.0-rc.1"];
        versions.sort_by(|a, b| compare_descending(a, b).unwrap());
        assert_eq!(versions, vec!["1.10.0", "1.10.0-rc.1", "1.2.0", "1.0.0"]);
    }

    #[test]
    fn test_comparator_consistency() {
        let pairs = [
            ("1.2.0", "1.1.0"),
            ("1.1.0", "1.2.0"),
            ("1.1.0", "1.1.0"),
            ("2.0.0-alpha", "2.0.0"),
        ];
        for (a, b) in pairs {
            let greater = is_greater_than(a, b).unwrap();
            let ordering = compare_descending(a, b).unwrap();
            assert_eq!(greater, ordering == Ordering::Less, "pair ({a}, {b})");
        }
    }

    #[test]
    fn test_comparator_transitivity() {
        let (a, b, c) = ("2.1.0", "2.0.5", "2.0.5-rc.2");
        assert!(is_greater_than(a, b).unwrap());
        assert!(is_greater_than(b, c).unwrap());
        assert!(is_greater_than(a, c).unwrap());
    }

    #[test]
    fn test_comparison_of_invalid_input_errors() {
        assert!(compare_descending("1.0", "1.0.0").is_err());
        assert!(is_greater_than("1.0.0", "not-a-version").is_err());
    }
}
