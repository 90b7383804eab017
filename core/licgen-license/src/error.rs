//! Error types for license issuance and verification.

use std::path::PathBuf;
use thiserror::Error;

/// Licensing-specific errors.
///
/// A failed signature check or an expired license is not an error; those are
/// reported through [`crate::VerificationResult`].
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Bad issuance input (empty customer name, non-positive validity).
    #[error("invalid license request: {0}")]
    Validation(String),

    /// Key material could not be decoded or encoded.
    #[error("invalid key format: {0}")]
    KeyFormat(String),

    /// Packet bytes are not a well-formed license packet.
    #[error("invalid license packet: {0}")]
    PacketFormat(String),

    /// The signing primitive rejected the key or the input.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Key pair generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// A key file was expected but is missing.
    #[error("key file not found: {}", .0.display())]
    KeyNotFound(PathBuf),

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Filesystem error.
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
