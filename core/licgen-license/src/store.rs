//! Key files and license packet files on disk.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::{debug, info};

use crate::error::{LicenseError, LicenseResult};
use crate::keys::{
    KeyPair, export_private_pem, export_public_pem, import_private_pem, import_public_pem,
};
use crate::packet::{LicensePacket, deserialize_packet, serialize_packet};
use crate::retention::{LICENSE_EXTENSION, RetentionPolicy, list_license_files};

/// Default private key file name.
pub const PRIVATE_KEY_FILE: &str = "chave_privada.pem";

/// Default public key file name.
pub const PUBLIC_KEY_FILE: &str = "chave_publica.pem";

/// Suffixed names tried by [`LicenseStore::save`] before giving up.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Locations of a PEM key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFiles {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

impl KeyFiles {
    #[must_use]
    pub fn new(private_key: impl Into<PathBuf>, public_key: impl Into<PathBuf>) -> Self {
        Self {
            private_key: private_key.into(),
            public_key: public_key.into(),
        }
    }

    /// The default file names inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(PRIVATE_KEY_FILE), dir.join(PUBLIC_KEY_FILE))
    }

    /// Writes both halves of `pair` as PEM.
    ///
    /// Without `overwrite`, fails with an `AlreadyExists` I/O error if either
    /// file is present. The private key file is created with mode 0600 on Unix.
    pub fn write(&self, pair: &KeyPair, overwrite: bool) -> LicenseResult<()> {
        let mode = if overwrite {
            WriteMode::Replace
        } else {
            for path in [&self.private_key, &self.public_key] {
                if path.exists() {
                    return Err(already_exists(format!("{} already exists", path.display())));
                }
            }
            WriteMode::CreateNew
        };
        let private_pem = export_private_pem(&pair.private_key)?;
        let public_pem = export_public_pem(&pair.public_key)?;

        write_file(&self.private_key, private_pem.as_bytes(), mode, true)?;
        write_file(&self.public_key, public_pem.as_bytes(), mode, false)?;
        info!(
            private_key = %self.private_key.display(),
            public_key = %self.public_key.display(),
            "Wrote RSA key pair"
        );
        Ok(())
    }

    /// Loads the private key.
    ///
    /// When the file is missing, a new pair is generated and written only if
    /// `generate_if_missing` is set; otherwise [`LicenseError::KeyNotFound`].
    /// A public key file without its private half is never replaced.
    pub fn load_private(&self, generate_if_missing: bool) -> LicenseResult<RsaPrivateKey> {
        if !self.private_key.exists() {
            if !generate_if_missing {
                return Err(LicenseError::KeyNotFound(self.private_key.clone()));
            }
            if self.public_key.exists() {
                return Err(already_exists(format!(
                    "private key {} is missing but public key {} exists; \
                     restore the private key or remove the public key",
                    self.private_key.display(),
                    self.public_key.display()
                )));
            }
            info!(
                path = %self.private_key.display(),
                "Private key missing, generating a new key pair"
            );
            let pair = KeyPair::generate()?;
            self.write(&pair, false)?;
            return Ok(pair.private_key);
        }

        debug!(path = %self.private_key.display(), "Loading private key");
        import_private_pem(&fs::read(&self.private_key)?)
    }

    /// Loads the public key. Never generates.
    pub fn load_public(&self) -> LicenseResult<RsaPublicKey> {
        if !self.public_key.exists() {
            return Err(LicenseError::KeyNotFound(self.public_key.clone()));
        }
        debug!(path = %self.public_key.display(), "Loading public key");
        import_public_pem(&fs::read(&self.public_key)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Replace,
    CreateNew,
}

fn already_exists(message: String) -> LicenseError {
    io::Error::new(io::ErrorKind::AlreadyExists, message).into()
}

fn write_file(path: &Path, contents: &[u8], mode: WriteMode, secret: bool) -> LicenseResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut options = OpenOptions::new();
    options.write(true);
    match mode {
        WriteMode::Replace => options.create(true).truncate(true),
        WriteMode::CreateNew => options.create_new(true),
    };
    if secret {
        owner_only(&mut options);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(unix)]
fn owner_only(options: &mut OpenOptions) {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(0o600);
}

#[cfg(not(unix))]
fn owner_only(_options: &mut OpenOptions) {}

/// Suggested file name for a new packet: `<CUSTOMER>_<YYYYMMDD_HHMMSS>.lic`.
///
/// Characters that are unsafe in file names are replaced with `_`.
#[must_use]
pub fn suggested_file_name(customer_name: &str, now: NaiveDateTime) -> String {
    format!("{}.{LICENSE_EXTENSION}", file_stem(customer_name, now))
}

fn file_stem(customer_name: &str, now: NaiveDateTime) -> String {
    let customer: String = customer_name
        .trim()
        .to_uppercase()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{customer}_{}", now.format("%Y%m%d_%H%M%S"))
}

/// Writes a packet to a new file at `path` in its pretty-printed form.
///
/// Existing files are never replaced; an occupied `path` is an
/// `AlreadyExists` I/O error.
pub fn write_packet(path: &Path, packet: &LicensePacket) -> LicenseResult<()> {
    write_file(path, &serialize_packet(packet)?, WriteMode::CreateNew, false)
}

/// Reads and parses the packet at `path`.
pub fn read_packet(path: &Path) -> LicenseResult<LicensePacket> {
    deserialize_packet(&fs::read(path)?)
}

/// A directory of issued license files with a retention policy.
#[derive(Debug, Clone)]
pub struct LicenseStore {
    dir: PathBuf,
    retention: RetentionPolicy,
}

impl LicenseStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, retention: RetentionPolicy) -> Self {
        Self {
            dir: dir.into(),
            retention,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves `packet` under its suggested name, then prunes old files.
    ///
    /// If that name is taken, `_1`, `_2`, ... is appended to the stem so an
    /// earlier packet is never replaced. Retention failures are logged and do
    /// not fail the save.
    pub fn save(&self, packet: &LicensePacket, now: NaiveDateTime) -> LicenseResult<PathBuf> {
        let stem = file_stem(&packet.license.customer_name, now);
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = match attempt {
                0 => format!("{stem}.{LICENSE_EXTENSION}"),
                n => format!("{stem}_{n}.{LICENSE_EXTENSION}"),
            };
            let path = self.dir.join(name);
            match self.save_as(&path, packet) {
                Err(LicenseError::Io(e)) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "License file name taken");
                }
                other => return other.map(|()| path),
            }
        }
        Err(already_exists(format!(
            "no free license file name for {stem} in {}",
            self.dir.display()
        )))
    }

    /// Saves `packet` at an explicit path, then prunes the store directory.
    ///
    /// Fails with an `AlreadyExists` I/O error if `path` is occupied.
    pub fn save_as(&self, path: &Path, packet: &LicensePacket) -> LicenseResult<()> {
        write_packet(path, packet)?;
        info!(
            path = %path.display(),
            customer = %packet.license.customer_name,
            expires = %packet.license.expiry_date,
            "Saved license"
        );
        self.prune();
        Ok(())
    }

    /// Applies the retention policy; returns removed paths.
    pub fn prune(&self) -> Vec<PathBuf> {
        self.retention.prune(&self.dir)
    }

    /// License files, newest first.
    pub fn list(&self) -> LicenseResult<Vec<PathBuf>> {
        list_license_files(&self.dir)
    }
}
