//! Login handshake and session lifecycle through the engine.

use super::TestHarness;
use chrono::{Duration, Utc};

#[test]
fn test_replayed_signature_rejected() {
    let harness = TestHarness::setup().unwrap();
    let key = TestHarness::wallet(7);
    let address = key.address().to_string();
    let engine = harness.engine();

    let challenge = engine.request_challenge(&address).unwrap();
    let signature = key.sign(&challenge.message());

    engine
        .verify_challenge(&address, &challenge.nonce, &signature)
        .unwrap();
    let err = engine
        .verify_challenge(&address, &challenge.nonce, &signature)
        .unwrap_err();
    assert_eq!(err.reason(), "NONCE_REUSED");
    assert_eq!(err.status_code(), 401);
}

#[test]
fn test_signature_from_other_wallet_rejected() {
    let harness = TestHarness::setup().unwrap();
    let victim = TestHarness::wallet(7);
    let attacker = TestHarness::wallet(8);
    let address = victim.address().to_string();
    let engine = harness.engine();

    let challenge = engine.request_challenge(&address).unwrap();
    let forged = attacker.sign(&challenge.message());
    let err = engine
        .verify_challenge(&address, &challenge.nonce, &forged)
        .unwrap_err();
    assert_eq!(err.reason(), "INVALID_SIGNATURE");

    // The failed attempt burned the nonce.
    let genuine = victim.sign(&challenge.message());
    let err = engine
        .verify_challenge(&address, &challenge.nonce, &genuine)
        .unwrap_err();
    assert_eq!(err.reason(), "NONCE_REUSED");
}

#[test]
fn test_nonce_issued_to_other_address_rejected() {
    let harness = TestHarness::setup().unwrap();
    let alice = TestHarness::wallet(7);
    let bob = TestHarness::wallet(8);
    let engine = harness.engine();

    let challenge = engine
        .request_challenge(&alice.address().to_string())
        .unwrap();
    let err = engine
        .verify_challenge(
            &bob.address().to_string(),
            &challenge.nonce,
            &bob.sign(&challenge.message()),
        )
        .unwrap_err();
    assert_eq!(err.reason(), "INVALID_SIGNATURE");
}

#[test]
fn test_expired_nonce_rejected() {
    let harness = TestHarness::setup().unwrap();
    let key = TestHarness::wallet(7);
    let identity = harness.engine().identity();
    let issued = Utc::now();

    let challenge = identity.issue_at(key.address(), issued);
    let err = identity
        .verify_at(
            &key.address(),
            &challenge.nonce,
            &key.sign(&challenge.message()),
            issued + Duration::seconds(301),
        )
        .unwrap_err();
    assert_eq!(err.reason(), "NONCE_EXPIRED");
}

#[test]
fn test_address_case_insensitive() {
    let harness = TestHarness::setup().unwrap();
    let key = TestHarness::wallet(7);
    let upper = key.address().to_string().to_uppercase().replacen("0X", "0x", 1);
    let engine = harness.engine();

    let challenge = engine.request_challenge(&upper).unwrap();
    let session = engine
        .verify_challenge(&upper, &challenge.nonce, &key.sign(&challenge.message()))
        .unwrap();
    assert_eq!(engine.sessions().resolve(&session).unwrap(), key.address());
}

#[test]
fn test_session_expires_and_is_swept() {
    let harness = TestHarness::setup().unwrap();
    let key = TestHarness::wallet(7);
    let session = harness.login(&key).unwrap();
    let engine = harness.engine();
    let later = Utc::now() + Duration::hours(25);

    let err = engine.sessions().resolve_at(&session, later).unwrap_err();
    assert_eq!(err.reason(), "SESSION_EXPIRED");
    assert!(engine.sessions().is_empty());

    harness.login(&key).unwrap();
    let (_, swept) = engine.sweep_at(later);
    assert_eq!(swept, 1);
}

#[test]
fn test_disconnect_all_sessions() {
    let harness = TestHarness::setup().unwrap();
    let key = TestHarness::wallet(7);
    let first = harness.login(&key).unwrap();
    let second = harness.login(&key).unwrap();
    let other = harness.login(&TestHarness::wallet(8)).unwrap();
    let engine = harness.engine();

    assert_eq!(engine.disconnect_all(&key.address()), 2);
    assert!(engine.sessions().resolve(&first).is_err());
    assert!(engine.sessions().resolve(&second).is_err());
    assert!(engine.sessions().resolve(&other).is_ok());
}
