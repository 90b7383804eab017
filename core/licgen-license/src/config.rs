//! Tool configuration, read from `<config dir>/licgen/config.toml`.
//!
//! Every field is optional; missing fields take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LicenseError, LicenseResult};
use crate::retention::{DEFAULT_KEEP, RetentionPolicy};
use crate::signer::DEFAULT_VALIDITY_DAYS;
use crate::store::{KeyFiles, LicenseStore, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};

/// Settings shared by the issuing and verifying front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicgenConfig {
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    pub license_dir: PathBuf,
    pub default_validity_days: i64,
    pub retention_keep: usize,
    /// Generate a key pair when the private key file is missing.
    pub generate_keys_if_missing: bool,
    /// Accept signatures over the earlier tool's record encoding.
    pub accept_legacy_encoding: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for LicgenConfig {
    fn default() -> Self {
        Self {
            private_key_path: Path::new("keys").join(PRIVATE_KEY_FILE),
            public_key_path: Path::new("keys").join(PUBLIC_KEY_FILE),
            license_dir: PathBuf::from("licencas"),
            default_validity_days: DEFAULT_VALIDITY_DAYS,
            retention_keep: DEFAULT_KEEP,
            generate_keys_if_missing: false,
            accept_legacy_encoding: false,
            log_file: None,
        }
    }
}

impl LicgenConfig {
    /// Default location of the configuration file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("licgen")
            .join("config.toml")
    }

    /// Loads from [`Self::default_path`].
    #[must_use]
    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    /// Loads from `path`, falling back to defaults if the file is missing or
    /// cannot be parsed.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "No config file found, using defaults");
            return Self::default();
        }
        match Self::try_load_from(path) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Falling back to default config");
                Self::default()
            }
        }
    }

    /// Loads from `path`, surfacing read and parse errors.
    pub fn try_load_from(path: &Path) -> LicenseResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parses TOML text.
    pub fn from_toml(contents: &str) -> LicenseResult<Self> {
        toml::from_str(contents).map_err(|e| LicenseError::Config(e.to_string()))
    }

    #[must_use]
    pub fn key_files(&self) -> KeyFiles {
        KeyFiles::new(&self.private_key_path, &self.public_key_path)
    }

    #[must_use]
    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.retention_keep)
    }

    #[must_use]
    pub fn license_store(&self) -> LicenseStore {
        LicenseStore::new(&self.license_dir, self.retention())
    }
}
