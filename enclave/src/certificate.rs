//! Wait-certificate issuance: the core anti-replay state machine.

use ed25519_dalek::Signer;
use rand_core::{OsRng, RngCore};

use shared::certificate::CertificateBundle;
use shared::timer::WaitTimer;
use shared::verify::verify_signed_payload;
use shared::{
    CERTIFICATE_NONCE_LENGTH, HexBytes, NULL_IDENTIFIER, PoetError, Result, WaitCertificate,
};

use crate::Enclave;

impl Enclave {
    /// Redeem a wait timer for a signed wait certificate bound to a block
    /// hash.
    ///
    /// Rejection paths, in order: bad timer signature, replay counter out
    /// of sequence, timer not yet expired, timer timed out. The counter
    /// is incremented only after the signed certificate exists, so a
    /// failure can never consume the timer, and a success always does:
    /// the next attempt against the same timer sees a mismatched
    /// sequence id.
    ///
    /// The genesis case (previous certificate id equal to the null
    /// identifier) bypasses both expiry checks, since there is no prior
    /// certificate to chain from.
    pub fn create_wait_certificate(
        &mut self,
        sealed_identity: &[u8],
        serialized_timer: &str,
        timer_signature: &HexBytes<64>,
        block_hash: &str,
    ) -> Result<CertificateBundle> {
        if block_hash.is_empty() {
            return Err(PoetError::InvalidArgument("block hash is empty".to_string()));
        }

        let identity = self.unseal_identity(sealed_identity)?;
        let timer = WaitTimer::deserialize(serialized_timer)?;

        verify_signed_payload(
            serialized_timer.as_bytes(),
            timer_signature,
            &identity.public_key(),
        )?;

        // The counter must still read exactly what the timer snapshotted;
        // anything else means another timer was redeemed in between.
        let live = self
            .counters
            .read(&identity.counter_id)?
            .ok_or_else(|| PoetError::IntegrityError("replay counter no longer exists".to_string()))?;
        if live != timer.sequence_id {
            tracing::error!(
                live,
                sequence_id = timer.sequence_id,
                "wait timer out of sequence (possible replay attack)"
            );
            return Err(PoetError::SequenceViolation);
        }

        let genesis = timer.previous_certificate_id == NULL_IDENTIFIER;
        // give the benefit of partially elapsed seconds
        let now = self.clock.now()?.ceil();
        if timer.expire_time() > now && !genesis {
            tracing::debug!(
                expire_time = timer.expire_time(),
                now,
                "certificate requested before timer expiry"
            );
            return Err(PoetError::TimerNotExpired);
        }
        if timer.timeout_time() < now && !genesis {
            tracing::debug!(
                timeout_time = timer.timeout_time(),
                now,
                "certificate requested after timer timeout"
            );
            return Err(PoetError::TimerExpired);
        }

        let mut nonce = [0u8; CERTIFICATE_NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce);

        let certificate = WaitCertificate {
            block_hash: block_hash.to_string(),
            duration: timer.duration,
            local_mean: timer.local_mean,
            nonce: hex::encode(nonce),
            previous_certificate_id: timer.previous_certificate_id.clone(),
            request_time: timer.request_time,
            validator_address: timer.validator_address.clone(),
        };
        let serialized = certificate.serialize()?;
        let signature = HexBytes(identity.signing_key().sign(serialized.as_bytes()).to_bytes());

        // Refresh the sealed snapshot before committing the increment, so
        // a successful return always hands back a blob that matches the
        // live counter. A crash in between leaves the counter untouched
        // and nothing returned (fail-stop, not fail-partial).
        let refreshed_identity = identity
            .with_counter_value(identity.counter_value + 1)
            .seal(&self.keys)?;
        self.counters.increment(&identity.counter_id)?;

        tracing::debug!(sequence_id = timer.sequence_id, "issued wait certificate");
        Ok(CertificateBundle {
            serialized,
            signature,
            refreshed_identity,
        })
    }
}
