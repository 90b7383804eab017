//! Signed software licenses.
//!
//! This crate handles:
//! - RSA-2048 key pair generation and PEM interchange
//! - Canonical encoding of license records (the exact signed bytes)
//! - Issuing license packets signed with RSA-PSS/SHA-256
//! - Offline verification of packets, including expiry
//! - License and key files on disk, with retention of old license files
//!
//! # Packet Format
//!
//! A packet is a JSON document holding the license record (`licenca`) and the
//! base64 signature (`assinatura`). The signature covers the compact JSON of
//! the record alone, `{"cliente":"...","validade":"YYYY-MM-DD"}`, with that
//! field order and no whitespace.
//!
//! # Design Principles
//!
//! - **Pure core**: signing and verification take the key, the record and the
//!   current time as arguments; they touch no files and emit no logs
//! - **Fail closed**: anything unreadable verifies as `SignatureInvalid`
//! - **Explicit key generation**: a missing key is only replaced on request

mod canonical;
mod clock;
mod config;
mod error;
mod keys;
mod packet;
mod retention;
mod signer;
mod store;
mod verifier;

pub use canonical::{Encoding, canonicalize, canonicalize_with};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::LicgenConfig;
pub use error::{LicenseError, LicenseResult};
pub use keys::{
    KEY_BITS, KeyPair, PUBLIC_EXPONENT, export_private_pem, export_public_pem, generate_with_rng,
    import_private_pem, import_public_pem, pss_max_salt_len,
};
pub use packet::{DATE_FORMAT, LicensePacket, LicenseRecord, deserialize_packet, serialize_packet};
pub use retention::{DEFAULT_KEEP, LICENSE_EXTENSION, RetentionPolicy, list_license_files};
pub use signer::{DEFAULT_VALIDITY_DAYS, LicenseIssuer, issue, sign, sign_with_rng};
pub use store::{
    KeyFiles, LicenseStore, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE, read_packet, suggested_file_name,
    write_packet,
};
pub use verifier::{LicenseVerifier, VerificationResult, verify, verify_packet};

pub use rsa::{RsaPrivateKey, RsaPublicKey};
