//! Offline license verification.
//!
//! Verification fails closed: malformed keys, malformed packets and
//! signature mismatches all yield [`VerificationResult::SignatureInvalid`].
//! Expiry is only evaluated once the signature checks out, so a tampered
//! record is never reported as merely expired.

use std::fmt;

use chrono::NaiveDateTime;
use rsa::{Pss, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::{Encoding, canonicalize_with};
use crate::clock::{Clock, SystemClock};
use crate::error::LicenseResult;
use crate::keys::{import_public_pem, pss_max_salt_len};
use crate::packet::{LicensePacket, deserialize_packet};

/// Outcome of checking a license packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationResult {
    /// Signature matches and today is on or before the expiry date.
    Valid,
    /// Signature does not match, or the inputs could not be read.
    SignatureInvalid,
    /// Signature matches but the expiry date has passed.
    Expired,
}

impl VerificationResult {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Valid => "valid",
            Self::SignatureInvalid => "signature invalid",
            Self::Expired => "expired",
        })
    }
}

/// Checks `packet` against `public_key` as of `now` (time of day ignored).
#[must_use]
pub fn verify_packet(
    packet: &LicensePacket,
    public_key: &RsaPublicKey,
    now: NaiveDateTime,
) -> VerificationResult {
    evaluate(packet, public_key, now, &[Encoding::Compact])
}

/// Parses PEM public key bytes and packet bytes, then checks the packet.
#[must_use]
pub fn verify(
    packet_bytes: &[u8],
    public_key_bytes: &[u8],
    now: NaiveDateTime,
) -> VerificationResult {
    let Ok(public_key) = import_public_pem(public_key_bytes) else {
        return VerificationResult::SignatureInvalid;
    };
    let Ok(packet) = deserialize_packet(packet_bytes) else {
        return VerificationResult::SignatureInvalid;
    };
    verify_packet(&packet, &public_key, now)
}

fn evaluate(
    packet: &LicensePacket,
    public_key: &RsaPublicKey,
    now: NaiveDateTime,
    encodings: &[Encoding],
) -> VerificationResult {
    let signed = encodings
        .iter()
        .any(|&encoding| signature_matches(packet, public_key, encoding));
    if !signed {
        return VerificationResult::SignatureInvalid;
    }
    if now.date() <= packet.license.expiry_date {
        VerificationResult::Valid
    } else {
        VerificationResult::Expired
    }
}

fn signature_matches(
    packet: &LicensePacket,
    public_key: &RsaPublicKey,
    encoding: Encoding,
) -> bool {
    let Some(salt_len) = pss_max_salt_len(public_key) else {
        return false;
    };
    let digest = Sha256::digest(canonicalize_with(&packet.license, encoding));
    public_key
        .verify(
            Pss::new_with_salt::<Sha256>(salt_len),
            &digest,
            &packet.signature,
        )
        .is_ok()
}

/// Verifies packets against one public key and a time source.
#[derive(Debug, Clone)]
pub struct LicenseVerifier<C = SystemClock> {
    public_key: RsaPublicKey,
    clock: C,
    accept_legacy_encoding: bool,
}

impl LicenseVerifier<SystemClock> {
    #[must_use]
    pub fn new(public_key: RsaPublicKey) -> Self {
        Self::with_clock(public_key, SystemClock)
    }

    /// Builds a verifier from SubjectPublicKeyInfo PEM bytes.
    pub fn from_public_pem(bytes: &[u8]) -> LicenseResult<Self> {
        Ok(Self::new(import_public_pem(bytes)?))
    }
}

impl<C: Clock> LicenseVerifier<C> {
    #[must_use]
    pub fn with_clock(public_key: RsaPublicKey, clock: C) -> Self {
        Self {
            public_key,
            clock,
            accept_legacy_encoding: false,
        }
    }

    /// Also accept signatures made over the earlier tool's record encoding.
    #[must_use]
    pub fn accept_legacy_encoding(mut self, accept: bool) -> Self {
        self.accept_legacy_encoding = accept;
        self
    }

    #[must_use]
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Checks a parsed packet as of the clock's current date.
    #[must_use]
    pub fn verify_packet(&self, packet: &LicensePacket) -> VerificationResult {
        let encodings: &[Encoding] = if self.accept_legacy_encoding {
            &[Encoding::Compact, Encoding::Legacy]
        } else {
            &[Encoding::Compact]
        };
        evaluate(packet, &self.public_key, self.clock.now(), encodings)
    }

    /// Parses and checks packet bytes; unreadable packets are `SignatureInvalid`.
    #[must_use]
    pub fn verify_bytes(&self, packet_bytes: &[u8]) -> VerificationResult {
        match deserialize_packet(packet_bytes) {
            Ok(packet) => self.verify_packet(&packet),
            Err(_) => VerificationResult::SignatureInvalid,
        }
    }
}
