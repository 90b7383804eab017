//! Shared test helpers for license tests.

#![allow(dead_code)]

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use licgen_license::{KeyPair, import_private_pem};

/// RSA-2048 issuer key produced by OpenSSL.
pub const ISSUER_A_PRIVATE: &str = include_str!("../fixtures/issuer_a_private.pem");
pub const ISSUER_A_PUBLIC: &str = include_str!("../fixtures/issuer_a_public.pem");

/// An unrelated RSA-2048 key, also produced by OpenSSL.
pub const ISSUER_B_PRIVATE: &str = include_str!("../fixtures/issuer_b_private.pem");
pub const ISSUER_B_PUBLIC: &str = include_str!("../fixtures/issuer_b_public.pem");

pub fn issuer_a() -> KeyPair {
    KeyPair::from_private(import_private_pem(ISSUER_A_PRIVATE.as_bytes()).unwrap())
}

pub fn issuer_b() -> KeyPair {
    KeyPair::from_private(import_private_pem(ISSUER_B_PRIVATE.as_bytes()).unwrap())
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Mid-afternoon on the given day, so date-only comparisons are exercised.
pub fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(15, 42, 7).unwrap()
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> Vec<u8> {
    std::fs::read(fixture_path(name)).unwrap()
}
