//! Signup: identity creation, unsealing, release, and registry-side
//! verification.

use ed25519_dalek::SigningKey;
use rand_core::OsRng;

use shared::signup::{EnclaveQuote, SignupData, signup_report_data};
use shared::{HexBytes, PoetError, Result};

use crate::Enclave;
use crate::attestation::AttestationProvider;
use crate::identity::ValidatorIdentity;

impl Enclave {
    /// Generate a fresh validator identity: an ed25519 keypair bound to a
    /// fresh replay counter, returned to the caller only in sealed form
    /// together with a quote that binds the keypair to the originator's
    /// external identity.
    pub fn create_signup_data(&mut self, originator_hash: &str) -> Result<SignupData> {
        if originator_hash.is_empty() {
            return Err(PoetError::InvalidArgument(
                "originator identity hash is empty".to_string(),
            ));
        }

        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key = HexBytes(signing_key.verifying_key().to_bytes());
        let report_data = signup_report_data(originator_hash, &public_key);
        let quote = self.attestation.quote(report_data)?;

        // the counter row is the last resource acquired; a sealing
        // failure must not leave an orphaned row behind
        let counter_id = self.counters.create()?;
        let identity = ValidatorIdentity {
            signing_key: signing_key.to_bytes(),
            counter_id,
            counter_value: 0,
        };
        let sealed_identity = match identity.seal(&self.keys) {
            Ok(sealed) => sealed,
            Err(e) => {
                let _ = self.counters.destroy(&identity.counter_id);
                return Err(e);
            }
        };

        tracing::info!(public_key = %public_key.encode(), "created signup data");
        Ok(SignupData {
            public_key,
            quote,
            manifest_hash: self.attestation.facts().manifest_hash,
            sealed_identity,
        })
    }

    /// Reopen a persisted identity after a process restart and return its
    /// public key. Rejects blobs whose replay counter has been destroyed
    /// or has advanced past the sealed snapshot.
    pub fn unseal_signup_data(&mut self, sealed_identity: &[u8]) -> Result<HexBytes<32>> {
        let identity = self.unseal_identity(sealed_identity)?;
        Ok(identity.public_key())
    }

    /// Decommission an identity by destroying its backing counter. Any
    /// blob referencing the counter is unusable afterwards.
    pub fn release_signup_data(&mut self, sealed_identity: &[u8]) -> Result<()> {
        let identity = ValidatorIdentity::unseal(&self.keys, sealed_identity)?;
        self.counters.destroy(&identity.counter_id)?;
        tracing::info!(public_key = %identity.public_key().encode(), "released signup data");
        Ok(())
    }

    /// Registry-side check that a claimed `(originator, public key)`
    /// binding genuinely originated inside a genuine instance of this
    /// trusted logic. Recomputes the expected report data and compares it
    /// plus the measurement, basename, and manifest hash against the
    /// presented quote. Never partially succeeds.
    pub fn verify_signup_info(
        &self,
        originator_hash: &str,
        public_key: &HexBytes<32>,
        quote: &str,
        manifest_hash: &HexBytes<32>,
    ) -> Result<()> {
        if originator_hash.is_empty() {
            return Err(PoetError::InvalidArgument(
                "originator identity hash is empty".to_string(),
            ));
        }
        let quote = EnclaveQuote::deserialize(quote)?;
        let facts = self.attestation.facts();

        if *manifest_hash != facts.manifest_hash {
            return Err(PoetError::SignupMismatch(
                "manifest hash does not match expected value".to_string(),
            ));
        }
        let expected = signup_report_data(originator_hash, public_key);
        if quote.report_data != expected {
            return Err(PoetError::SignupMismatch(
                "report data does not bind the claimed keypair".to_string(),
            ));
        }
        if quote.measurement != facts.measurement {
            return Err(PoetError::SignupMismatch(
                "measurement in quote does not match expected value".to_string(),
            ));
        }
        if quote.basename != facts.basename {
            return Err(PoetError::SignupMismatch(
                "basename in quote does not match expected value".to_string(),
            ));
        }
        Ok(())
    }
}
