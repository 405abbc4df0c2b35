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

//! Release publication
//!
//! Validates and registers a new release for an artifact the upload
//! boundary has already written to disk. Any failure after that point
//! removes the artifact again, so a rejected publish leaves neither a
//! release row nor an orphaned file behind.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::digest;
use crate::error::{CoreError, Result};
use crate::model::{NewRelease, Release};
use crate::store::ReleaseRepository;
use crate::version;

/// Publisher-supplied release metadata, as received at the upload boundary.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub app_version: String,
    pub bundle_version: String,
    pub force_update: bool,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct ReleasePublisher {
    repo: Arc<dyn ReleaseRepository>,
}

impl std::fmt::Debug for ReleasePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleasePublisher").finish_non_exhaustive()
    }
}

impl ReleasePublisher {
    pub fn new(repo: Arc<dyn ReleaseRepository>) -> Self {
        Self { repo }
    }

    /// Register the artifact stored at `artifact_path` under `stored_name`
    /// as a new active release.
    ///
    /// The artifact must already be durably written; the digest is computed
    /// from the stored bytes so hash and file name always describe the same
    /// content.
    pub async fn publish(
        &self,
        request: PublishRequest,
        artifact_path: &Path,
        stored_name: &str,
    ) -> Result<Release> {
        if request.app_version.trim().is_empty() {
            remove_artifact(artifact_path);
            return Err(CoreError::MissingField("appVersion"));
        }

        if !version::is_valid(&request.bundle_version) {
            remove_artifact(artifact_path);
            return Err(CoreError::InvalidVersion(request.bundle_version));
        }

        let file_hash = match digest::digest_file(artifact_path).await {
            Ok(hash) => hash,
            Err(error) => {
                remove_artifact(artifact_path);
                return Err(error);
            }
        };
        info!(file = stored_name, hash = %file_hash, "Computed artifact digest");

        let inserted = self.repo.insert(NewRelease {
            app_version: request.app_version,
            bundle_version: request.bundle_version,
            file_name: stored_name.to_owned(),
            file_hash,
            force_update: request.force_update,
            description: request.description,
        });

        match inserted {
            Ok(release) => {
                info!(
                    app_version = %release.app_version,
                    bundle_version = %release.bundle_version,
                    "Release published"
                );
                Ok(release)
            }
            Err(error) => {
                remove_artifact(artifact_path);
                Err(error)
            }
        }
    }
}

/// Best-effort cleanup of a rejected upload. A failed unlink is logged and
/// must never replace the error that caused the cleanup.
fn remove_artifact(path: &Path) {
    if let Err(error) = std::fs::remove_file(path) {
        warn!(
            path = %path.display(),
            error = %error,
            "Failed to remove artifact after publish error"
        );
    }
}
