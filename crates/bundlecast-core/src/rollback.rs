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

//! Release rollback
//!
//! Takes a bad release out of resolution without touching its artifact.
//! Deactivation is terminal: nothing in this crate sets a release active
//! again.

use std::sync::Arc;

use tracing::info;

use crate::error::{CoreError, Result};
use crate::model::Release;
use crate::store::ReleaseRepository;

#[derive(Clone)]
pub struct ReleaseRollbackManager {
    repo: Arc<dyn ReleaseRepository>,
}

impl std::fmt::Debug for ReleaseRollbackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseRollbackManager").finish_non_exhaustive()
    }
}

impl ReleaseRollbackManager {
    pub fn new(repo: Arc<dyn ReleaseRepository>) -> Self {
        Self { repo }
    }

    /// Deactivate the release matching `bundle_version`. The match is
    /// global across app versions. Rolling back an already-inactive
    /// release succeeds again; an unknown version is `ReleaseNotFound`.
    pub fn rollback(&self, bundle_version: &str) -> Result<Release> {
        if bundle_version.trim().is_empty() {
            return Err(CoreError::MissingField("bundleVersionToDisable"));
        }

        match self.repo.deactivate_by_bundle_version(bundle_version)? {
            Some(release) => {
                info!(
                    bundle_version = %release.bundle_version,
                    app_version = %release.app_version,
                    "Release rolled back"
                );
                Ok(release)
            }
            None => Err(CoreError::ReleaseNotFound(bundle_version.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewRelease;
    use crate::store::SqliteReleaseRepository;

    fn seeded_manager(
        releases: &[(&str, &str)],
    ) -> (ReleaseRollbackManager, Arc<dyn ReleaseRepository>) {
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
        (
            ReleaseRollbackManager::new(Arc::clone(&repo)),
            repo,
        )
    }

    #[test]
    fn test_rollback_deactivates_release() {
        let (manager, repo) = seeded_manager(&[("1.0.0", "1.2.0")]);

        let release = manager.rollback("1.2.0").unwrap();
        assert!(!release.is_active);
        assert!(repo.active_for_app_version("1.0.0").unwrap().is_empty());
    }

    #[test]
    fn test_rollback_is_idempotent() {
        let (manager, _repo) = seeded_manager(&[("1.0.0", "1.2.0")]);

        manager.rollback("1.2.0").unwrap();
        let again = manager.rollback("1.2.0").unwrap();
        assert!(!again.is_active);
    }

    #[test]
    fn test_rollback_unknown_version_is_not_found() {
        let (manager, repo) = seeded_manager(&[("1.0.0", "1.2.0")]);

        let err = manager.rollback("9.9.9").unwrap_err();
        assert!(matches!(err, CoreError::ReleaseNotFound(_)));

        // Nothing was mutated
        assert_eq!(repo.active_for_app_version("1.0.0").unwrap().len(), 1);
    }

    #[test]
    fn test_rollback_blank_version_is_rejected() {
        let (manager, _repo) = seeded_manager(&[]);

        let err = manager.rollback("").unwrap_err();
        assert!(matches!(err, CoreError::MissingField(_)));
    }

    #[test]
    fn test_rollback_leaves_other_releases_active() {
        let (manager, repo) = seeded_manager(&[("1.0.0", "1.2.0"), ("1.0.0", "1.3.0")]);

        manager.rollback("1.2.0").unwrap();

        let remaining = repo.active_for_app_version("1.0.0").unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].bundle_version, "1.3.0");
    }
}
