//! Wait-timer issuance.

use ed25519_dalek::Signer;

use shared::timer::{SignedTimer, WaitTimer};
use shared::{
    CERTIFICATE_ID_LENGTH, HexBytes, MAX_ADDRESS_LENGTH, MIN_ADDRESS_LENGTH, PoetError, Result,
};

use crate::Enclave;
use crate::duration::generate_duration;

impl Enclave {
    /// Issue a signed wait timer committing the validator to its
    /// randomized delay.
    ///
    /// The current replay counter value is embedded as the sequence id
    /// without being incremented; the certificate issuer later checks
    /// that the counter has not advanced, which proves no other timer was
    /// redeemed in the interim.
    pub fn create_wait_timer(
        &mut self,
        sealed_identity: &[u8],
        validator_address: &str,
        previous_certificate_id: &str,
        request_time: f64,
        local_mean: f64,
    ) -> Result<SignedTimer> {
        if !(local_mean > 0.0) {
            return Err(PoetError::InvalidArgument(
                "local mean must be greater than zero".to_string(),
            ));
        }
        if previous_certificate_id.len() != CERTIFICATE_ID_LENGTH {
            return Err(PoetError::InvalidArgument(format!(
                "previous certificate id must be {CERTIFICATE_ID_LENGTH} characters"
            )));
        }
        if validator_address.len() < MIN_ADDRESS_LENGTH
            || validator_address.len() > MAX_ADDRESS_LENGTH
        {
            return Err(PoetError::InvalidArgument(
                "validator address length is out of range".to_string(),
            ));
        }

        let identity = self.unseal_identity(sealed_identity)?;
        let sequence_id = identity.counter_value;
        let trusted_request_time = self.clock.now()?;
        let duration = generate_duration(
            &self.keys,
            validator_address,
            previous_certificate_id,
            local_mean,
        );

        let timer = WaitTimer {
            duration,
            local_mean,
            previous_certificate_id: previous_certificate_id.to_string(),
            request_time,
            sequence_id,
            trusted_request_time,
            validator_address: validator_address.to_string(),
        };
        let serialized = timer.serialize()?;
        let signature = HexBytes(identity.signing_key().sign(serialized.as_bytes()).to_bytes());

        tracing::debug!(duration, sequence_id, "issued wait timer");
        Ok(SignedTimer {
            serialized,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "1QEdLTsGGatKJJdNGqsoQqina45TZQp6jM";
    const PREV_ID: &str = "aaaaaaaaaaaaaaaa";

    fn enclave() -> (tempfile::TempDir, Enclave, Vec<u8>) {
        let dir = tempfile::tempdir().expect("Test failed");
        let mut enclave = Enclave::open(dir.path()).expect("Test failed");
        let signup = enclave.create_signup_data("deadbeef").expect("Test failed");
        (dir, enclave, signup.sealed_identity)
    }

    #[test]
    fn timer_is_signed_by_identity_key() {
        let (_dir, mut enclave, sealed) = enclave();
        let pk = enclave.unseal_signup_data(&sealed).expect("Test failed");
        let timer = enclave
            .create_wait_timer(&sealed, ADDRESS, PREV_ID, 100.0, 30.0)
            .expect("Test failed");
        shared::verify::verify_signed_payload(timer.serialized.as_bytes(), &timer.signature, &pk)
            .expect("Test failed");
    }

    #[test]
    fn sequence_id_snapshots_counter_without_advancing() {
        let (_dir, mut enclave, sealed) = enclave();
        let first = enclave
            .create_wait_timer(&sealed, ADDRESS, PREV_ID, 100.0, 30.0)
            .expect("Test failed");
        let second = enclave
            .create_wait_timer(&sealed, ADDRESS, PREV_ID, 100.0, 30.0)
            .expect("Test failed");
        let first = WaitTimer::deserialize(&first.serialized).expect("Test failed");
        let second = WaitTimer::deserialize(&second.serialized).expect("Test failed");
        assert_eq!(first.sequence_id, 0);
        assert_eq!(second.sequence_id, 0);
    }

    #[test]
    fn duration_ignores_request_time() {
        let (_dir, mut enclave, sealed) = enclave();
        let a = enclave
            .create_wait_timer(&sealed, ADDRESS, PREV_ID, 100.0, 30.0)
            .expect("Test failed");
        let b = enclave
            .create_wait_timer(&sealed, ADDRESS, PREV_ID, 9000.0, 30.0)
            .expect("Test failed");
        let a = WaitTimer::deserialize(&a.serialized).expect("Test failed");
        let b = WaitTimer::deserialize(&b.serialized).expect("Test failed");
        assert_eq!(a.duration, b.duration);
    }

    #[test]
    fn rejects_bad_arguments() {
        let (_dir, mut enclave, sealed) = enclave();
        // non-positive local mean
        assert!(matches!(
            enclave.create_wait_timer(&sealed, ADDRESS, PREV_ID, 100.0, 0.0),
            Err(PoetError::InvalidArgument(_))
        ));
        // previous certificate id with the wrong length
        assert!(matches!(
            enclave.create_wait_timer(&sealed, ADDRESS, "abc", 100.0, 30.0),
            Err(PoetError::InvalidArgument(_))
        ));
        // address too short
        assert!(matches!(
            enclave.create_wait_timer(&sealed, "short", PREV_ID, 100.0, 30.0),
            Err(PoetError::InvalidArgument(_))
        ));
        // address too long
        let long = "a".repeat(MAX_ADDRESS_LENGTH + 1);
        assert!(matches!(
            enclave.create_wait_timer(&sealed, &long, PREV_ID, 100.0, 30.0),
            Err(PoetError::InvalidArgument(_))
        ));
    }
}
