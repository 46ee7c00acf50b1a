//! Peer-side checks for the wait-certificate protocol.
//!
//! Nothing here touches the trusted subsystem. A peer receiving a block
//! holds the proposer's public key (from its registered signup data) and
//! the expected platform facts (distributed out of band), and checks the
//! broadcast certificate and the registration claim against those alone.

use tracing_subscriber::fmt::SubscriberBuilder;

use shared::certificate::certificate_identifier;
use shared::signup::{EnclaveQuote, signup_report_data};
use shared::{HexBytes, WaitCertificate, verify_wait_certificate};

pub mod error;

use crate::error::{Error, Result};

pub fn init_logging() {
    SubscriberBuilder::default().with_ansi(true).init();
}

/// A certificate that passed all checks, together with its chain
/// identifier.
pub struct CheckedCertificate {
    pub identifier: String,
    pub certificate: WaitCertificate,
}

/// Verify a broadcast wait certificate.
///
/// Checks the signature over the exact serialized bytes, then optionally
/// that the certificate extends the expected predecessor and covers the
/// expected block. Returns the certificate's identifier, which successor
/// timers must reference.
pub fn check_wait_certificate(
    serialized: &str,
    signature: &str,
    public_key: &str,
    expected_previous_id: Option<&str>,
    expected_block_hash: Option<&str>,
) -> Result<CheckedCertificate> {
    let signature = HexBytes::<64>::decode(signature)?;
    let public_key = HexBytes::<32>::decode(public_key)?;
    verify_wait_certificate(serialized, &signature, &public_key)?;

    let certificate = WaitCertificate::deserialize(serialized)?;
    if let Some(expected) = expected_previous_id {
        if certificate.previous_certificate_id != expected {
            return Err(Error::ChainMismatch {
                expected: expected.to_string(),
                actual: certificate.previous_certificate_id,
            });
        }
    }
    if let Some(expected) = expected_block_hash {
        if certificate.block_hash != expected {
            return Err(Error::BlockMismatch {
                expected: expected.to_string(),
                actual: certificate.block_hash,
            });
        }
    }
    Ok(CheckedCertificate {
        identifier: certificate_identifier(serialized),
        certificate,
    })
}

/// The platform facts a peer expects genuine signups to attest to.
pub struct ExpectedFacts {
    pub measurement: HexBytes<32>,
    pub basename: HexBytes<32>,
}

impl ExpectedFacts {
    pub fn decode(measurement: &str, basename: &str) -> Result<Self> {
        Ok(Self {
            measurement: HexBytes::decode(measurement)?,
            basename: HexBytes::decode(basename)?,
        })
    }
}

/// Check that a peer's registration claim holds: the quote must attest
/// the expected platform and bind the claimed originator and public key.
/// Returns the parsed public key on success.
pub fn check_signup_quote(
    originator_hash: &str,
    public_key: &str,
    quote: &str,
    expected: &ExpectedFacts,
) -> Result<HexBytes<32>> {
    let public_key = HexBytes::<32>::decode(public_key)?;
    let quote = EnclaveQuote::deserialize(quote)?;

    if quote.measurement != expected.measurement {
        return Err(Error::QuoteMismatch(
            "measurement does not match the expected platform".to_string(),
        ));
    }
    if quote.basename != expected.basename {
        return Err(Error::QuoteMismatch(
            "basename does not match the expected platform".to_string(),
        ));
    }
    if quote.report_data != signup_report_data(originator_hash, &public_key) {
        return Err(Error::QuoteMismatch(
            "report data does not bind the claimed keypair".to_string(),
        ));
    }
    Ok(public_key)
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signer, SigningKey};
    use rand_core::OsRng;

    use super::*;

    fn signed_certificate() -> (String, String, String) {
        let key = SigningKey::generate(&mut OsRng);
        let certificate = WaitCertificate {
            block_hash: "bf85d1e1cc0ee0f3".to_string(),
            duration: 12.25,
            local_mean: 30.0,
            nonce: "00".repeat(32),
            previous_certificate_id: "a0b1c2d3e4f50617".to_string(),
            request_time: 100.0,
            validator_address: "1QEdLTsGGatKJJdNGqsoQqina45TZQp6jM".to_string(),
        };
        let serialized = certificate.serialize().unwrap();
        let signature = hex::encode(key.sign(serialized.as_bytes()).to_bytes());
        let public_key = hex::encode(key.verifying_key().to_bytes());
        (serialized, signature, public_key)
    }

    #[test]
    fn accepts_valid_certificate() {
        let (serialized, signature, public_key) = signed_certificate();
        let checked = check_wait_certificate(
            &serialized,
            &signature,
            &public_key,
            Some("a0b1c2d3e4f50617"),
            Some("bf85d1e1cc0ee0f3"),
        )
        .unwrap();
        assert_eq!(checked.identifier, certificate_identifier(&serialized));
    }

    #[test]
    fn rejects_wrong_chain_position() {
        let (serialized, signature, public_key) = signed_certificate();
        assert!(matches!(
            check_wait_certificate(
                &serialized,
                &signature,
                &public_key,
                Some("ffffffffffffffff"),
                None,
            ),
            Err(Error::ChainMismatch { .. })
        ));
    }

    #[test]
    fn rejects_wrong_block() {
        let (serialized, signature, public_key) = signed_certificate();
        assert!(matches!(
            check_wait_certificate(&serialized, &signature, &public_key, None, Some("other")),
            Err(Error::BlockMismatch { .. })
        ));
    }

    #[test]
    fn rejects_foreign_signature() {
        let (serialized, _, public_key) = signed_certificate();
        let (_, foreign_signature, _) = signed_certificate();
        assert!(
            check_wait_certificate(&serialized, &foreign_signature, &public_key, None, None)
                .is_err()
        );
    }

    #[test]
    fn signup_quote_binds_originator_and_key() {
        let public_key = HexBytes([0xabu8; 32]);
        let expected = ExpectedFacts {
            measurement: HexBytes([1u8; 32]),
            basename: HexBytes([2u8; 32]),
        };
        let quote = EnclaveQuote {
            basename: expected.basename,
            measurement: expected.measurement,
            report_data: signup_report_data("deadbeef", &public_key),
        }
        .serialize()
        .unwrap();

        check_signup_quote("deadbeef", &public_key.encode(), &quote, &expected).unwrap();
        assert!(matches!(
            check_signup_quote("deadbeee", &public_key.encode(), &quote, &expected),
            Err(Error::QuoteMismatch(_))
        ));
    }

    #[test]
    fn signup_quote_rejects_foreign_platform() {
        let public_key = HexBytes([0xabu8; 32]);
        let quote = EnclaveQuote {
            basename: HexBytes([2u8; 32]),
            measurement: HexBytes([9u8; 32]),
            report_data: signup_report_data("deadbeef", &public_key),
        }
        .serialize()
        .unwrap();
        let expected = ExpectedFacts {
            measurement: HexBytes([1u8; 32]),
            basename: HexBytes([2u8; 32]),
        };
        assert!(matches!(
            check_signup_quote("deadbeef", &public_key.encode(), &quote, &expected),
            Err(Error::QuoteMismatch(_))
        ));
    }
}
