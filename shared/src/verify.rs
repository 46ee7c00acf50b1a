//! Stateless wait-certificate verification.
//!
//! Deliberately free of any enclave, counter, or clock dependency so that
//! any peer holding only the issuer's public key can check the consensus
//! artifact before accepting the associated block.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::HexBytes;
use crate::error::{PoetError, Result};

/// Verify `signature` over the exact serialized certificate bytes against
/// the claimed public key.
pub fn verify_wait_certificate(
    serialized_certificate: &str,
    signature: &HexBytes<64>,
    public_key: &HexBytes<32>,
) -> Result<()> {
    verify_signed_payload(serialized_certificate.as_bytes(), signature, public_key)
}

/// Signature check shared by certificate verification and the trusted
/// side's own timer-signature validation.
pub fn verify_signed_payload(
    payload: &[u8],
    signature: &HexBytes<64>,
    public_key: &HexBytes<32>,
) -> Result<()> {
    let key = VerifyingKey::from_bytes(&public_key.0)
        .map_err(|_| PoetError::InvalidArgument("public key is not a valid point".to_string()))?;
    let signature = Signature::from_bytes(&signature.0);
    key.verify(payload, &signature)
        .map_err(|_| PoetError::InvalidSignature)
}
