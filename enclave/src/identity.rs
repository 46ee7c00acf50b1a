//! The sealed validator identity: a signing keypair bound 1:1 to a
//! replay counter.

use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};

use shared::{HexBytes, Result};

use crate::sealing::PlatformKeys;

/// The plaintext contents of a sealed identity blob. Never leaves the
/// trusted boundary in this form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorIdentity {
    /// Raw ed25519 signing key bytes.
    pub signing_key: [u8; 32],
    /// Identifier of the replay counter bound to this keypair.
    pub counter_id: String,
    /// Counter value at sealing time. Unsealing rejects the blob when the
    /// live counter disagrees, which is what detects stale backups.
    pub counter_value: u32,
}

impl ValidatorIdentity {
    pub fn signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(&self.signing_key)
    }

    pub fn public_key(&self) -> HexBytes<32> {
        HexBytes(self.signing_key().verifying_key().to_bytes())
    }

    /// Serialize and seal under the platform's identity-sealing key.
    pub fn seal(&self, keys: &PlatformKeys) -> Result<Vec<u8>> {
        let plaintext = serde_cbor::to_vec(self).map_err(|e| {
            shared::PoetError::PlatformFault(format!("identity serialization failed: {e}"))
        })?;
        keys.seal(&plaintext)
    }

    /// Open a sealed blob. Counter liveness is checked separately by the
    /// enclave, which owns the counter store.
    pub fn unseal(keys: &PlatformKeys, sealed: &[u8]) -> Result<Self> {
        let plaintext = keys.unseal(sealed)?;
        serde_cbor::from_slice(&plaintext).map_err(|_| {
            shared::PoetError::IntegrityError(
                "sealed blob did not decrypt to a validator identity".to_string(),
            )
        })
    }

    /// A copy of this identity with an updated counter snapshot, used to
    /// refresh the sealed blob after the counter increments.
    pub fn with_counter_value(&self, counter_value: u32) -> Self {
        Self {
            counter_value,
            ..self.clone()
        }
    }
}
