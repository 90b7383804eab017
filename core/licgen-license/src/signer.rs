//! License issuance: RSA-PSS signing of canonical license records.
//!
//! Signatures use PSS with SHA-256 for both the message digest and MGF1, and
//! the largest salt the key allows (222 bytes for a 2048-bit modulus).

use chrono::{Datelike, Days, NaiveDateTime};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use rsa::{Pss, RsaPrivateKey};
use sha2::{Digest, Sha256};

use crate::canonical::canonicalize;
use crate::clock::{Clock, SystemClock};
use crate::error::{LicenseError, LicenseResult};
use crate::keys::pss_max_salt_len;
use crate::packet::{LicensePacket, LicenseRecord};

/// Validity period used when the caller does not choose one.
pub const DEFAULT_VALIDITY_DAYS: i64 = 30;

const MAX_EXPIRY_YEAR: i32 = 9999;

/// Signs `record` with fresh randomness from the operating system.
pub fn sign(record: LicenseRecord, private_key: &RsaPrivateKey) -> LicenseResult<LicensePacket> {
    sign_with_rng(record, private_key, &mut OsRng)
}

/// Signs `record`, drawing the PSS salt from `rng`.
///
/// # Errors
///
/// Returns [`LicenseError::Signing`] if the key is inconsistent or its
/// modulus cannot hold a SHA-256 PSS encoding.
pub fn sign_with_rng<R: CryptoRng + RngCore>(
    record: LicenseRecord,
    private_key: &RsaPrivateKey,
    rng: &mut R,
) -> LicenseResult<LicensePacket> {
    private_key
        .validate()
        .map_err(|e| LicenseError::Signing(format!("invalid private key: {e}")))?;
    let salt_len = pss_max_salt_len(private_key).ok_or_else(|| {
        LicenseError::Signing("key too small for RSA-PSS with SHA-256".to_string())
    })?;

    let digest = Sha256::digest(canonicalize(&record));
    let signature = private_key
        .sign_with_rng(rng, Pss::new_with_salt::<Sha256>(salt_len), &digest)
        .map_err(|e| LicenseError::Signing(e.to_string()))?;

    Ok(LicensePacket {
        license: record,
        signature,
    })
}

/// Builds and signs a license for `customer_name` valid for `validity_days`
/// calendar days after `now`'s date.
///
/// The customer name is stored trimmed.
///
/// # Errors
///
/// Returns [`LicenseError::Validation`] for a blank name, a non-positive
/// validity period or an expiry beyond year 9999, and
/// [`LicenseError::Signing`] if signing fails.
pub fn issue(
    customer_name: &str,
    validity_days: i64,
    now: NaiveDateTime,
    private_key: &RsaPrivateKey,
) -> LicenseResult<LicensePacket> {
    let record = build_record(customer_name, validity_days, now)?;
    sign(record, private_key)
}

fn build_record(
    customer_name: &str,
    validity_days: i64,
    now: NaiveDateTime,
) -> LicenseResult<LicenseRecord> {
    let customer_name = customer_name.trim();
    if customer_name.is_empty() {
        return Err(LicenseError::Validation(
            "customer name is required".to_string(),
        ));
    }
    let days = u64::try_from(validity_days)
        .ok()
        .filter(|&d| d > 0)
        .ok_or_else(|| {
            LicenseError::Validation(format!(
                "validity must be a positive number of days, got {validity_days}"
            ))
        })?;
    let expiry_date = now
        .date()
        .checked_add_days(Days::new(days))
        .filter(|d| d.year() <= MAX_EXPIRY_YEAR)
        .ok_or_else(|| {
            LicenseError::Validation(format!("validity of {validity_days} days is out of range"))
        })?;

    Ok(LicenseRecord::new(customer_name, expiry_date))
}

/// Issues licenses with a fixed private key and time source.
pub struct LicenseIssuer<C = SystemClock> {
    private_key: RsaPrivateKey,
    clock: C,
}

impl LicenseIssuer<SystemClock> {
    #[must_use]
    pub fn new(private_key: RsaPrivateKey) -> Self {
        Self::with_clock(private_key, SystemClock)
    }
}

impl<C: Clock> LicenseIssuer<C> {
    #[must_use]
    pub fn with_clock(private_key: RsaPrivateKey, clock: C) -> Self {
        Self { private_key, clock }
    }

    /// Issues a license valid for `validity_days` from today.
    pub fn issue(&self, customer_name: &str, validity_days: i64) -> LicenseResult<LicensePacket> {
        issue(
            customer_name,
            validity_days,
            self.clock.now(),
            &self.private_key,
        )
    }

    /// Issues a license with [`DEFAULT_VALIDITY_DAYS`].
    pub fn issue_default(&self, customer_name: &str) -> LicenseResult<LicensePacket> {
        self.issue(customer_name, DEFAULT_VALIDITY_DAYS)
    }
}

impl<C> std::fmt::Debug for LicenseIssuer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseIssuer")
            .field("private_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}
