//! Signup artifacts binding a validator's external identity to a keypair
//! generated inside the trusted boundary.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::HexBytes;
use crate::error::{PoetError, Result};

/// Compute the report data embedded in a signup quote:
/// `SHA256(UPPER(originator_hash) || UPPER(hex(public_key)))`.
///
/// Both halves are upper-cased to canonicalize the hex before hashing.
/// Anything that changes this representation must change the verifier in
/// lockstep; the bound value is what lets a registry confirm that a
/// claimed keypair genuinely originated inside the trusted logic.
pub fn signup_report_data(originator_hash: &str, public_key: &HexBytes<32>) -> HexBytes<32> {
    let mut preimage = originator_hash.to_uppercase();
    preimage.push_str(&public_key.encode().to_uppercase());
    HexBytes(Sha256::digest(preimage.as_bytes()).into())
}

/// The simulated attestation quote. Carries the facts an external
/// attestation flow would extract from a hardware quote: the enclave
/// measurement, the basename, and the signup report data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnclaveQuote {
    #[serde(rename = "Basename")]
    pub basename: HexBytes<32>,
    #[serde(rename = "Measurement")]
    pub measurement: HexBytes<32>,
    #[serde(rename = "ReportData")]
    pub report_data: HexBytes<32>,
}

impl EnclaveQuote {
    pub fn serialize(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| PoetError::PlatformFault(format!("quote serialization failed: {e}")))
    }

    pub fn deserialize(serialized: &str) -> Result<Self> {
        serde_json::from_str(serialized)
            .map_err(|e| PoetError::InvalidArgument(format!("failed to parse quote: {e}")))
    }
}

/// Read-only hardware-derived facts about the trusted subsystem, consumed
/// by external attestation flows.
#[derive(Debug, Clone)]
pub struct AttestationFacts {
    pub measurement: HexBytes<32>,
    pub basename: HexBytes<32>,
    pub manifest_hash: HexBytes<32>,
}

/// Everything signup hands back to the untrusted caller. The sealed
/// identity is opaque to the caller, who persists it and passes it back
/// on subsequent timer and certificate requests.
#[derive(Debug, Clone)]
pub struct SignupData {
    pub public_key: HexBytes<32>,
    pub quote: String,
    pub manifest_hash: HexBytes<32>,
    pub sealed_identity: Vec<u8>,
}
