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

//! The `Release` entity and update decisions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published bundle release. Field names serialize in camelCase because
/// mobile clients already speak that wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: i64,

    /// Host application build this bundle targets. Exact-match key, not
    /// an ordered version.
    pub app_version: String,

    /// Semantic version of the bundle payload. Validated before a release
    /// is ever persisted.
    pub bundle_version: String,

    /// Server-local name of the stored artifact (e.g. "1709123456-xxxx.zip")
    pub file_name: String,

    /// Lowercase hex SHA-256 of the stored artifact bytes, computed once at
    /// publish time.
    pub file_hash: String,

    /// Clients must not defer this update
    pub force_update: bool,

    /// Eligible for resolution. Cleared by rollback, never set back.
    pub is_active: bool,

    pub description: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Fields of a release that is about to be persisted. `is_active`,
/// `created_at` and the row id are assigned by the repository.
#[derive(Debug, Clone)]
pub struct NewRelease {
    pub app_version: String,
    pub bundle_version: String,
    pub file_name: String,
    pub file_hash: String,
    pub force_update: bool,
    pub description: Option<String>,
}

/// Outcome of resolving a client's update check.
#[derive(Debug, Clone)]
pub enum UpdateDecision {
    /// A strictly newer active release exists for the client's app version.
    Available(Release),
    /// Active releases exist but none is newer than the client's bundle.
    AlreadyCurrent,
    /// No active release matches the client's app version at all.
    NoCompatibleRelease,
}
