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

//! Error types for the core crate

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid bundle version format: {0}")]
    InvalidVersion(String),

    #[error("no bundle artifact received")]
    MissingArtifact,

    #[error("unsupported artifact type: {0} (only .zip bundles are accepted)")]
    UnsupportedArtifact(String),

    #[error("release not found for bundle version {0}")]
    ReleaseNotFound(String),

    #[error("failed to read artifact: {0}")]
    Digest(std::io::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("datastore error: {0}")]
    Store(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
