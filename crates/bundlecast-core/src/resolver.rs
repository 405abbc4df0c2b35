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

//! Update resolution
//!
//! Matches a client's installed app/bundle versions against the active
//! releases and picks the latest eligible one. Read-only.

use std::sync::Arc;

use tracing::warn;

use crate::error::{CoreError, Result};
use crate::model::{Release, UpdateDecision};
use crate::store::ReleaseRepository;
use crate::version;

#[derive(Clone)]
pub struct ReleaseResolver {
    repo: Arc<dyn ReleaseRepository>,
}

impl std::fmt::Debug for ReleaseResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseResolver").finish_non_exhaustive()
    }
}

impl ReleaseResolver {
    pub fn new(repo: Arc<dyn ReleaseRepository>) -> Self {
        Self { repo }
    }

    /// Decide whether a newer compatible bundle exists for a client on
    /// `app_version` currently running `current_bundle_version`.
    ///
    /// Malformed input is rejected before the store is queried, so a bad
    /// request is never mistaken for "no update available".
    pub fn resolve_update(
        &self,
        app_version: &str,
        current_bundle_version: &str,
    ) -> Result<UpdateDecision> {
        if app_version.trim().is_empty() {
            return Err(CoreError::MissingField("currentAppVersion"));
        }
        let current = version::parse(current_bundle_version)?;

        let candidates = self.repo.active_for_app_version(app_version)?;
        if candidates.is_empty() {
            return Ok(UpdateDecision::NoCompatibleRelease);
        }

        let mut ordered: Vec<(semver::Version, Release)> = candidates
            .into_iter()
            .filter_map(|release| match version::parse(&release.bundle_version) {
                Ok(parsed) => Some((parsed, release)),
                Err(_) => {
                    // Publish validates before insert; such a row can only
                    // come from a hand-edited store.
                    warn!(
                        bundle_version = %release.bundle_version,
                        "Skipping release with unparseable stored version"
                    );
                    None
                }
            })
            .collect();

        // Stable sort: equal bundle versions keep store order, which is
        // deliberately left unspecified.
        ordered.sort_by(|a, b| b.0.cmp(&a.0));

        let Some((latest_version, latest)) = ordered.into_iter().next() else {
            return Ok(UpdateDecision::NoCompatibleRelease);
        };

        if latest_version > current {
            Ok(UpdateDecision::Available(latest))
        } else {
            Ok(UpdateDecision::AlreadyCurrent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewRelease;
    use crate::store::SqliteReleaseRepository;

    fn seeded_resolver(releases: &[(&str, &str)]) -> (ReleaseResolver, Arc<dyn ReleaseRepository>) {
        let repo: Arc<dyn ReleaseRepository> =
            Arc::new(SqliteReleaseRepository::open_in_memory().unwrap());
        for (app_version, bundle_version) in releases {
            repo.insert(NewRelease {
                app_version: (*app_version).to_owned(),
                bundle_version: (*bundle_version).to_owned(),
                file_name: format!("{bundle_version}.zip"),
                file_hash: "cafe".to_owned(),
                force_update: false,
                description: None,
            })
            .unwrap();
        }
        (ReleaseResolver::new(Arc::clone(&repo)), repo)
    }

    #[test]
    fn test_no_compatible_release() {
        let (resolver, _repo) = seeded_resolver(&[("2.0.0", "1.5.0")]);

        let decision = resolver.resolve_update("1.0.0", "1.0.0").unwrap();
        assert!(matches!(decision, UpdateDecision::NoCompatibleRelease));
    }

    #[test]
    fn test_already_current_on_equal_version() {
        let (resolver, _repo) = seeded_resolver(&[("1.0.0", "1.2.0")]);

        let decision = resolver.resolve_update("1.0.0", "1.2.0").unwrap();
        assert!(matches!(decision, UpdateDecision::AlreadyCurrent));
    }

    #[test]
    fn test_already_current_when_client_is_ahead() {
        let (resolver, _repo) = seeded_resolver(&[("1.0.0", "1.2.0")]);

        let decision = resolver.resolve_update("1.0.0", "1.3.0").unwrap();
        assert!(matches!(decision, UpdateDecision::AlreadyCurrent));
    }

    #[test]
    fn test_picks_highest_active_bundle_version() {
        let (resolver, _repo) = seeded_resolver(&[
            ("1.0.0", "1.2.0"),
            ("1.0.0", "1.10.0"),
            ("1.0.0", "1.9.1"),
            ("2.0.0", "9.0.0"),
        ]);

        let decision = resolver.resolve_update("1.0.0", "1.1.0").unwrap();
        let UpdateDecision::Available(release) = &decision else {
            panic!("expected an available update, got {decision:?}");
        };
        assert_eq!(release.bundle_version, "1.10.0");
    }

    #[test]
    fn test_rolled_back_release_is_not_offered() {
        let (resolver, repo) = seeded_resolver(&[("1.0.0", "1.2.0"), ("1.0.0", "1.1.0")]);
        repo.deactivate_by_bundle_version("1.2.0").unwrap();

        // Client on 1.1.0 falls back to "already current": only 1.1.0 is left
        let decision = resolver.resolve_update("1.0.0", "1.1.0").unwrap();
        assert!(matches!(decision, UpdateDecision::AlreadyCurrent));
    }

    #[test]
    fn test_prerelease_is_not_newer_than_its_release() {
        let (resolver, _repo) = seeded_resolver(&[("1.0.0", "1.2.0-rc.1")]);

        let decision = resolver.resolve_update("1.0.0", "1.2.0").unwrap();
        assert!(matches!(decision, UpdateDecision::AlreadyCurrent));

        let decision = resolver.resolve_update("1.0.0", "1.1.0").unwrap();
        assert!(matches!(decision, UpdateDecision::Available(_)));
    }

    #[test]
    fn test_blank_app_version_is_rejected_before_querying() {
        let (resolver, _repo) = seeded_resolver(&[]);

        let err = resolver.resolve_update("  ", "1.0.0").unwrap_err();
        assert!(matches!(err, CoreError::MissingField(_)));
    }

    #[test]
    fn test_malformed_current_bundle_version_is_rejected() {
        let (resolver, _repo) = seeded_resolver(&[("1.0.0", "1.2.0")]);

        let err = resolver.resolve_update("1.0.0", "1.1").unwrap_err();
        assert!(matches!(err, CoreError::InvalidVersion(_)));
    }
}
