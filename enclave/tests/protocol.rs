//! End-to-end protocol properties: determinism, exactly-once
//! certification, expiry enforcement, genesis bypass, and rollback
//! detection.

use tempo_enclave::Enclave;
use tempo_enclave::time::ManualClock;

use shared::certificate::certificate_identifier;
use shared::timer::WaitTimer;
use shared::{
    CERTIFICATE_ID_LENGTH, NULL_IDENTIFIER, PoetError, TIMER_TIMEOUT_PERIOD, WaitCertificate,
    verify_wait_certificate,
};

const ADDRESS: &str = "1QEdLTsGGatKJJdNGqsoQqina45TZQp6jM";
const PREV_ID: &str = "a0b1c2d3e4f50617";
const BLOCK_HASH: &str = "b6f1c2f7d2bcddf63b1f89df22cb8c3b";

struct Fixture {
    _dir: tempfile::TempDir,
    clock: ManualClock,
    enclave: Enclave,
    sealed: Vec<u8>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("Test failed");
    let clock = ManualClock::new(1_000.0);
    let mut enclave =
        Enclave::open_with_clock(dir.path(), Box::new(clock.clone())).expect("Test failed");
    let signup = enclave.create_signup_data("deadbeef").expect("Test failed");
    Fixture {
        _dir: dir,
        clock,
        enclave,
        sealed: signup.sealed_identity,
    }
}

#[test]
fn duration_is_deterministic_across_reloads() {
    let dir = tempfile::tempdir().expect("Test failed");
    let clock = ManualClock::new(1_000.0);
    let sealed;
    let first;
    {
        let mut enclave =
            Enclave::open_with_clock(dir.path(), Box::new(clock.clone())).expect("Test failed");
        sealed = enclave
            .create_signup_data("deadbeef")
            .expect("Test failed")
            .sealed_identity;
        let timer = enclave
            .create_wait_timer(&sealed, ADDRESS, PREV_ID, 100.0, 30.0)
            .expect("Test failed");
        first = WaitTimer::deserialize(&timer.serialized).expect("Test failed");
    }
    // same installation, fresh load: the draw must reproduce exactly
    let mut enclave =
        Enclave::open_with_clock(dir.path(), Box::new(clock)).expect("Test failed");
    let timer = enclave
        .create_wait_timer(&sealed, ADDRESS, PREV_ID, 555.0, 30.0)
        .expect("Test failed");
    let second = WaitTimer::deserialize(&timer.serialized).expect("Test failed");
    assert_eq!(first.duration, second.duration);
}

#[test]
fn exactly_once_certification() {
    let mut fx = fixture();
    let timer = fx
        .enclave
        .create_wait_timer(&fx.sealed, ADDRESS, PREV_ID, 100.0, 30.0)
        .expect("Test failed");
    let parsed = WaitTimer::deserialize(&timer.serialized).expect("Test failed");
    fx.clock.set(parsed.timeout_time() - 1.0);

    let bundle = fx
        .enclave
        .create_wait_certificate(&fx.sealed, &timer.serialized, &timer.signature, BLOCK_HASH)
        .expect("Test failed");

    // the stale blob no longer matches the advanced counter
    assert!(matches!(
        fx.enclave
            .create_wait_certificate(&fx.sealed, &timer.serialized, &timer.signature, BLOCK_HASH),
        Err(PoetError::IntegrityError(_))
    ));
    // even with the refreshed blob, the consumed timer is out of sequence
    assert!(matches!(
        fx.enclave.create_wait_certificate(
            &bundle.refreshed_identity,
            &timer.serialized,
            &timer.signature,
            BLOCK_HASH,
        ),
        Err(PoetError::SequenceViolation)
    ));
}

#[test]
fn expiry_window_is_enforced() {
    let mut fx = fixture();
    let timer = fx
        .enclave
        .create_wait_timer(&fx.sealed, ADDRESS, PREV_ID, 100.0, 30.0)
        .expect("Test failed");
    let parsed = WaitTimer::deserialize(&timer.serialized).expect("Test failed");

    // too early
    fx.clock.set(parsed.expire_time() - 2.0);
    assert!(matches!(
        fx.enclave
            .create_wait_certificate(&fx.sealed, &timer.serialized, &timer.signature, BLOCK_HASH),
        Err(PoetError::TimerNotExpired)
    ));

    // too late
    fx.clock.set(parsed.timeout_time() + 1.0);
    assert!(matches!(
        fx.enclave
            .create_wait_certificate(&fx.sealed, &timer.serialized, &timer.signature, BLOCK_HASH),
        Err(PoetError::TimerExpired)
    ));

    // inside the window
    fx.clock.set(parsed.expire_time() + 1.0);
    fx.enclave
        .create_wait_certificate(&fx.sealed, &timer.serialized, &timer.signature, BLOCK_HASH)
        .expect("Test failed");
}

#[test]
fn genesis_bypasses_the_wait() {
    let mut fx = fixture();
    let timer = fx
        .enclave
        .create_wait_timer(&fx.sealed, ADDRESS, NULL_IDENTIFIER, 100.0, 30.0)
        .expect("Test failed");
    // no clock movement at all: the genesis certificate may be minted
    // immediately
    fx.enclave
        .create_wait_certificate(&fx.sealed, &timer.serialized, &timer.signature, BLOCK_HASH)
        .expect("Test failed");
}

#[test]
fn genesis_ignores_timeout_too() {
    let mut fx = fixture();
    let timer = fx
        .enclave
        .create_wait_timer(&fx.sealed, ADDRESS, NULL_IDENTIFIER, 100.0, 30.0)
        .expect("Test failed");
    let parsed = WaitTimer::deserialize(&timer.serialized).expect("Test failed");
    fx.clock
        .set(parsed.timeout_time() + TIMER_TIMEOUT_PERIOD * 10.0);
    fx.enclave
        .create_wait_certificate(&fx.sealed, &timer.serialized, &timer.signature, BLOCK_HASH)
        .expect("Test failed");
}

#[test]
fn certificate_verifies_against_public_key() {
    let mut fx = fixture();
    let pk = fx.enclave.unseal_signup_data(&fx.sealed).expect("Test failed");
    let timer = fx
        .enclave
        .create_wait_timer(&fx.sealed, ADDRESS, NULL_IDENTIFIER, 100.0, 30.0)
        .expect("Test failed");
    let bundle = fx
        .enclave
        .create_wait_certificate(&fx.sealed, &timer.serialized, &timer.signature, BLOCK_HASH)
        .expect("Test failed");

    verify_wait_certificate(&bundle.serialized, &bundle.signature, &pk).expect("Test failed");

    // any flipped byte breaks verification
    let mut tampered = bundle.serialized.clone().into_bytes();
    tampered[0] ^= 0x01;
    assert!(
        verify_wait_certificate(
            std::str::from_utf8(&tampered).expect("Test failed"),
            &bundle.signature,
            &pk,
        )
        .is_err()
    );

    let certificate = WaitCertificate::deserialize(&bundle.serialized).expect("Test failed");
    assert_eq!(certificate.block_hash, BLOCK_HASH);
    assert_eq!(certificate.previous_certificate_id, NULL_IDENTIFIER);
    assert_eq!(
        certificate_identifier(&bundle.serialized).len(),
        CERTIFICATE_ID_LENGTH
    );
}

#[test]
fn certificates_chain_through_identifiers() {
    let mut fx = fixture();
    let timer = fx
        .enclave
        .create_wait_timer(&fx.sealed, ADDRESS, NULL_IDENTIFIER, 100.0, 30.0)
        .expect("Test failed");
    let genesis = fx
        .enclave
        .create_wait_certificate(&fx.sealed, &timer.serialized, &timer.signature, BLOCK_HASH)
        .expect("Test failed");

    let genesis_id = certificate_identifier(&genesis.serialized);
    let timer = fx
        .enclave
        .create_wait_timer(
            &genesis.refreshed_identity,
            ADDRESS,
            &genesis_id,
            200.0,
            30.0,
        )
        .expect("Test failed");
    let parsed = WaitTimer::deserialize(&timer.serialized).expect("Test failed");
    assert_eq!(parsed.sequence_id, 1);
    assert_eq!(parsed.previous_certificate_id, genesis_id);

    fx.clock.set(parsed.expire_time() + 1.0);
    let second = fx
        .enclave
        .create_wait_certificate(
            &genesis.refreshed_identity,
            &timer.serialized,
            &timer.signature,
            BLOCK_HASH,
        )
        .expect("Test failed");
    let certificate = WaitCertificate::deserialize(&second.serialized).expect("Test failed");
    assert_eq!(certificate.previous_certificate_id, genesis_id);
}

#[test]
fn stale_blob_fails_rollback_check() {
    let mut fx = fixture();
    let timer = fx
        .enclave
        .create_wait_timer(&fx.sealed, ADDRESS, NULL_IDENTIFIER, 100.0, 30.0)
        .expect("Test failed");
    fx.enclave
        .create_wait_certificate(&fx.sealed, &timer.serialized, &timer.signature, BLOCK_HASH)
        .expect("Test failed");

    // the original blob embeds counter value 0, the live counter is at 1
    assert!(matches!(
        fx.enclave.unseal_signup_data(&fx.sealed),
        Err(PoetError::IntegrityError(_))
    ));
}

#[test]
fn tampered_timer_signature_is_rejected() {
    let mut fx = fixture();
    let timer = fx
        .enclave
        .create_wait_timer(&fx.sealed, ADDRESS, NULL_IDENTIFIER, 100.0, 30.0)
        .expect("Test failed");
    let mut signature = timer.signature;
    signature.0[10] ^= 0xff;
    assert!(matches!(
        fx.enclave
            .create_wait_certificate(&fx.sealed, &timer.serialized, &signature, BLOCK_HASH),
        Err(PoetError::InvalidSignature)
    ));
}
