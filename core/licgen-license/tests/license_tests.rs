mod common;

use common::{ISSUER_A_PUBLIC, ISSUER_B_PUBLIC, at, date, fixture, issuer_a, issuer_b};
use licgen_license::{
    FixedClock, KEY_BITS, KeyPair, LicenseError, LicenseIssuer, LicenseRecord, LicenseVerifier,
    PUBLIC_EXPONENT, VerificationResult, canonicalize, deserialize_packet, issue, serialize_packet,
    sign, verify, verify_packet,
};
use pretty_assertions::assert_eq;
use rsa::BigUint;
use rsa::traits::PublicKeyParts;

// ── Issuance ─────────────────────────────────────────────────────

#[test]
fn acme_corp_scenario() {
    let keys = issuer_a();
    let packet = issue("Acme Corp", 30, at(2024, 1, 1), &keys.private_key).unwrap();

    assert_eq!(packet.license.customer_name, "Acme Corp");
    assert_eq!(packet.license.expiry_date, date(2024, 1, 31));

    let bytes = serialize_packet(&packet).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.contains(r#""cliente": "Acme Corp""#));
    assert!(text.contains(r#""validade": "2024-01-31""#));

    let reparsed = deserialize_packet(&bytes).unwrap();
    assert_eq!(reparsed, packet);
    assert_eq!(
        verify_packet(&reparsed, &keys.public_key, at(2024, 1, 15)),
        VerificationResult::Valid
    );
    assert_eq!(
        verify_packet(&reparsed, &keys.public_key, at(2024, 2, 1)),
        VerificationResult::Expired
    );
}

#[test]
fn issue_rejects_bad_input() {
    let keys = issuer_a();
    let now = at(2024, 1, 1);
    for (name, days) in [("", 30), ("   ", 30), ("Acme", 0), ("Acme", -5)] {
        let err = issue(name, days, now, &keys.private_key).unwrap_err();
        assert!(
            matches!(err, LicenseError::Validation(_)),
            "{name:?}/{days} gave {err:?}"
        );
    }
}

#[test]
fn issuer_uses_clock_and_default_validity() {
    let keys = issuer_a();
    let issuer = LicenseIssuer::with_clock(keys.private_key.clone(), FixedClock(at(2024, 12, 15)));
    let packet = issuer.issue_default("  Globex  ").unwrap();
    assert_eq!(packet.license.customer_name, "Globex");
    assert_eq!(packet.license.expiry_date, date(2025, 1, 14));
}

#[test]
fn signatures_are_randomized_but_both_verify() {
    let keys = issuer_a();
    let record = LicenseRecord::new("Acme Corp", date(2024, 1, 31));
    let first = sign(record.clone(), &keys.private_key).unwrap();
    let second = sign(record, &keys.private_key).unwrap();

    assert_eq!(first.signature.len(), 256);
    assert_ne!(first.signature, second.signature);
    for packet in [&first, &second] {
        assert!(verify_packet(packet, &keys.public_key, at(2024, 1, 1)).is_valid());
    }
}

#[test]
fn fresh_key_pair_round_trip() {
    let keys = KeyPair::generate().unwrap();
    assert_eq!(keys.public_key.n().bits(), KEY_BITS);
    assert_eq!(keys.public_key.e(), &BigUint::from(PUBLIC_EXPONENT));
    assert_eq!(keys.private_key.size(), 256);

    let packet = issue("Initech", 7, at(2024, 6, 1), &keys.private_key).unwrap();
    assert_eq!(
        verify_packet(&packet, &keys.public_key, at(2024, 6, 8)),
        VerificationResult::Valid
    );
}

// ── Verification ─────────────────────────────────────────────────

#[test]
fn expiry_boundary_is_inclusive() {
    let keys = issuer_a();
    let today = date(2024, 5, 20);
    let packet = sign(LicenseRecord::new("Acme", today), &keys.private_key).unwrap();

    let start_of_day = today.and_hms_opt(0, 0, 0).unwrap();
    let end_of_day = today.and_hms_opt(23, 59, 59).unwrap();
    let tomorrow = date(2024, 5, 21).and_hms_opt(0, 0, 1).unwrap();

    assert_eq!(verify_packet(&packet, &keys.public_key, start_of_day), VerificationResult::Valid);
    assert_eq!(verify_packet(&packet, &keys.public_key, end_of_day), VerificationResult::Valid);
    assert_eq!(verify_packet(&packet, &keys.public_key, tomorrow), VerificationResult::Expired);
}

#[test]
fn wrong_key_rejected() {
    let a = issuer_a();
    let b = issuer_b();
    let packet = issue("Acme", 30, at(2024, 1, 1), &a.private_key).unwrap();
    assert_eq!(
        verify_packet(&packet, &b.public_key, at(2024, 1, 2)),
        VerificationResult::SignatureInvalid
    );
}

#[test]
fn changed_expiry_rejected() {
    let keys = issuer_a();
    let mut packet = issue("Acme", 30, at(2024, 1, 1), &keys.private_key).unwrap();
    packet.license.expiry_date = date(2099, 12, 31);
    assert_eq!(
        verify_packet(&packet, &keys.public_key, at(2024, 1, 2)),
        VerificationResult::SignatureInvalid
    );
}

#[test]
fn edited_packet_file_rejected() {
    let keys = issuer_a();
    let packet = issue("Acme", 30, at(2024, 1, 1), &keys.private_key).unwrap();
    let text = String::from_utf8(serialize_packet(&packet).unwrap()).unwrap();
    let forged = text.replace("2024-01-31", "2034-01-31");
    assert_eq!(
        verify(forged.as_bytes(), ISSUER_A_PUBLIC.as_bytes(), at(2024, 1, 2)),
        VerificationResult::SignatureInvalid
    );
}

#[test]
fn reformatted_packet_still_verifies() {
    let keys = issuer_a();
    let packet = issue("Acme Corp", 30, at(2024, 1, 1), &keys.private_key).unwrap();
    let value: serde_json::Value =
        serde_json::from_slice(&serialize_packet(&packet).unwrap()).unwrap();
    let compact = serde_json::to_vec(&value).unwrap();
    assert_eq!(
        verify(&compact, ISSUER_A_PUBLIC.as_bytes(), at(2024, 1, 2)),
        VerificationResult::Valid
    );
}

#[test]
fn verify_entry_point_fails_closed() {
    let now = at(2024, 1, 2);
    let packet_bytes = fixture("openssl_acme_corp.lic");
    assert_eq!(verify(&packet_bytes, b"", now), VerificationResult::SignatureInvalid);
    assert_eq!(
        verify(b"{\"licenca\":{}}", ISSUER_A_PUBLIC.as_bytes(), now),
        VerificationResult::SignatureInvalid
    );
    assert_eq!(
        verify(&packet_bytes, ISSUER_B_PUBLIC.as_bytes(), now),
        VerificationResult::SignatureInvalid
    );
}

// ── Cross-implementation fixtures ────────────────────────────────

#[test]
fn packet_signed_by_openssl_verifies() {
    let bytes = fixture("openssl_acme_corp.lic");
    let key = ISSUER_A_PUBLIC.as_bytes();
    assert_eq!(verify(&bytes, key, at(2024, 1, 15)), VerificationResult::Valid);
    assert_eq!(verify(&bytes, key, at(2024, 2, 1)), VerificationResult::Expired);
}

#[test]
fn canonical_bytes_match_fixture_input() {
    let packet = deserialize_packet(&fixture("openssl_acme_corp.lic")).unwrap();
    assert_eq!(
        canonicalize(&packet.license),
        br#"{"cliente":"Acme Corp","validade":"2024-01-31"}"#.to_vec()
    );
}

#[test]
fn legacy_packet_needs_opt_in() {
    let bytes = fixture("legacy_empresa_xyz.lic");
    let clock = FixedClock(at(2024, 1, 10));
    let keys = issuer_a();

    let strict = LicenseVerifier::with_clock(keys.public_key.clone(), clock);
    assert_eq!(strict.verify_bytes(&bytes), VerificationResult::SignatureInvalid);
    assert_eq!(
        verify(&bytes, ISSUER_A_PUBLIC.as_bytes(), clock.0),
        VerificationResult::SignatureInvalid
    );

    let compat = strict.accept_legacy_encoding(true);
    assert_eq!(compat.verify_bytes(&bytes), VerificationResult::Valid);

    let expired = LicenseVerifier::with_clock(keys.public_key, FixedClock(at(2024, 2, 1)))
        .accept_legacy_encoding(true);
    assert_eq!(expired.verify_bytes(&bytes), VerificationResult::Expired);
}

#[test]
fn legacy_opt_in_does_not_accept_other_keys() {
    let bytes = fixture("legacy_empresa_xyz.lic");
    let verifier = LicenseVerifier::with_clock(issuer_b().public_key, FixedClock(at(2024, 1, 10)))
        .accept_legacy_encoding(true);
    assert_eq!(verifier.verify_bytes(&bytes), VerificationResult::SignatureInvalid);
}

#[test]
fn verifier_from_pem() {
    let verifier = LicenseVerifier::from_public_pem(ISSUER_A_PUBLIC.as_bytes()).unwrap();
    assert_eq!(verifier.public_key(), &issuer_a().public_key);
    assert!(matches!(
        LicenseVerifier::from_public_pem(b"-----BEGIN PUBLIC KEY-----\n-----END PUBLIC KEY-----"),
        Err(LicenseError::KeyFormat(_))
    ));
}
