//! The signed wait-certificate payload, the consensus artifact proving a
//! wait timer was honored.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{PoetError, Result};
use crate::{CERTIFICATE_ID_LENGTH, HexBytes};

/// A signed proof that a validator honored its randomized wait.
///
/// Minted by the trusted certificate issuer, broadcast to peers, verified
/// by anyone holding the issuer's public key, and never mutated after
/// signing. Fields are declared in alphabetical key order for canonical
/// serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitCertificate {
    /// Hash of the block this certificate justifies proposing.
    #[serde(rename = "BlockHash")]
    pub block_hash: String,
    #[serde(rename = "Duration")]
    pub duration: f64,
    #[serde(rename = "LocalMean")]
    pub local_mean: f64,
    /// Random hex nonce decorrelating certificate identifiers.
    #[serde(rename = "Nonce")]
    pub nonce: String,
    #[serde(rename = "PreviousCertID")]
    pub previous_certificate_id: String,
    /// The caller-supplied request time carried over from the timer, not
    /// trusted time.
    #[serde(rename = "RequestTime")]
    pub request_time: f64,
    #[serde(rename = "ValidatorAddress")]
    pub validator_address: String,
}

impl WaitCertificate {
    /// Serialize to the canonical key-sorted JSON form that gets signed.
    pub fn serialize(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            PoetError::PlatformFault(format!("wait certificate serialization failed: {e}"))
        })
    }

    pub fn deserialize(serialized: &str) -> Result<Self> {
        serde_json::from_str(serialized).map_err(|e| {
            PoetError::InvalidArgument(format!("failed to parse wait certificate: {e}"))
        })
    }
}

/// Derive a certificate's chain identifier from its exact serialized
/// bytes: the leading hex characters of its SHA-256 digest. Successor
/// timers reference this value as their previous certificate id.
pub fn certificate_identifier(serialized: &str) -> String {
    let digest = Sha256::digest(serialized.as_bytes());
    hex::encode(digest)[..CERTIFICATE_ID_LENGTH].to_string()
}

/// Everything the certificate issuer hands back on success.
///
/// The refreshed sealed identity embeds the post-increment replay counter
/// value; the session manager persists it in place of the blob that was
/// passed in, keeping the rollback check accurate across restarts.
#[derive(Debug, Clone)]
pub struct CertificateBundle {
    pub serialized: String,
    pub signature: HexBytes<64>,
    pub refreshed_identity: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn certificate() -> WaitCertificate {
        WaitCertificate {
            block_hash: "bf85d1e1cc0ee0f3".to_string(),
            duration: 12.25,
            local_mean: 30.0,
            nonce: "00".repeat(32),
            previous_certificate_id: "a0b1c2d3e4f50617".to_string(),
            request_time: 100.0,
            validator_address: "1QEdLTsGGatKJJdNGqsoQqina45TZQp6jM".to_string(),
        }
    }

    #[test]
    fn canonical_key_order() {
        let serialized = certificate().serialize().unwrap();
        let positions: Vec<usize> = [
            "\"BlockHash\"",
            "\"Duration\"",
            "\"LocalMean\"",
            "\"Nonce\"",
            "\"PreviousCertID\"",
            "\"RequestTime\"",
            "\"ValidatorAddress\"",
        ]
        .iter()
        .map(|key| serialized.find(key).expect("missing key"))
        .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn identifier_is_stable_and_fixed_length() {
        let serialized = certificate().serialize().unwrap();
        let id = certificate_identifier(&serialized);
        assert_eq!(id.len(), CERTIFICATE_ID_LENGTH);
        assert_eq!(id, certificate_identifier(&serialized));
    }

    #[test]
    fn identifier_depends_on_contents() {
        let mut cert = certificate();
        let first = certificate_identifier(&cert.serialize().unwrap());
        cert.nonce = "11".repeat(32);
        let second = certificate_identifier(&cert.serialize().unwrap());
        assert_ne!(first, second);
    }
}
