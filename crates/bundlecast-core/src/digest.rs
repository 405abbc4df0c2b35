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

//! Streaming artifact digest
//!
//! SHA-256 over a stored artifact, fed in fixed-size chunks so large bundles
//! never have to fit in memory. The task yields only at chunk-read
//! boundaries.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::{CoreError, Result};

const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the lowercase hex SHA-256 digest of a file's full content.
///
/// A read failure surfaces as `CoreError::Digest`; a partial digest is never
/// returned.
pub async fn digest_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).await.map_err(CoreError::Digest)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file.read(&mut buf).await.map_err(CoreError::Digest)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
