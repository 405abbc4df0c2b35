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

//! Server configuration
//!
//! Loaded from an optional TOML file, then overridden by the environment:
//! `BUNDLECAST_PORT` (or `PORT`) for the listening port and `BUNDLECAST_DB`
//! for the SQLite path. Every key has a fallback default, so the server
//! starts with no config file at all.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "./bundlecast.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub uploads: UploadSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// External base URL used in download links (e.g. behind a reverse
    /// proxy). When unset, links are built from the request Host header.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    #[serde(default = "default_uploads_dir")]
    pub dir: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "./data/bundlecast.db".to_owned()
}

fn default_uploads_dir() -> String {
    "./uploads".to_owned()
}

fn default_max_upload_bytes() -> usize {
    512 * 1024 * 1024
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            public_base_url: None,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            dir: default_uploads_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    /// Read the config file if present, fall back to defaults otherwise,
    /// then apply environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = Self::from_file_or_default(path)?;
        config.apply_overrides(
            env_var("BUNDLECAST_PORT").or_else(|| env_var("PORT")),
            env_var("BUNDLECAST_DB"),
        );
        Ok(config)
    }

    fn from_file_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {path}"))?;
            toml::from_str(&content).with_context(|| "Failed to parse config TOML")
        } else {
            Ok(Self::default())
        }
    }

    fn apply_overrides(&mut self, port: Option<String>, db_path: Option<String>) {
        if let Some(port) = port {
            match port.parse() {
                Ok(parsed) => self.server.port = parsed,
                Err(_) => warn!("Ignoring unparseable port override: {port}"),
            }
        }
        if let Some(db_path) = db_path {
            self.database.path = db_path;
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert!(config.server.public_base_url.is_none());
        assert_eq!(config.database.path, "./data/bundlecast.db");
        assert_eq!(config.uploads.dir, "./uploads");
        assert_eq!(config.uploads.max_upload_bytes, 512 * 1024 * 1024);
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundlecast.toml");
        std::fs::write(
            &path,
            "[server]\nport = 8080\n\n[uploads]\ndir = \"/srv/bundles\"\n",
        )
        .unwrap();

        let config = ServerConfig::from_file_or_default(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.uploads.dir, "/srv/bundles");
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.database.path, "./data/bundlecast.db");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = ServerConfig::from_file_or_default("/nonexistent/bundlecast.toml").unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServerConfig::default();
        config.apply_overrides(Some("9000".to_owned()), Some("/tmp/other.db".to_owned()));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.path, "/tmp/other.db");
    }

    #[test]
    fn test_unparseable_port_override_is_ignored() {
        let mut config = ServerConfig::default();
        config.apply_overrides(Some("not-a-port".to_owned()), None);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundlecast.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        assert!(ServerConfig::from_file_or_default(path.to_str().unwrap()).is_err());
    }
}
