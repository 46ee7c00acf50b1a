//! Types, constants, and stateless verification logic shared between the
//! trusted and untrusted halves of the wait-certificate service.
//!
//! Everything crossing the trust boundary lives here: the canonical signed
//! payloads ([`WaitTimer`], [`WaitCertificate`]), the signup artifacts, the
//! error taxonomy, and the peer-usable certificate verification routine.

pub mod certificate;
pub mod encoding;
pub mod error;
pub mod signup;
pub mod timer;
pub mod verify;

pub use certificate::WaitCertificate;
pub use encoding::HexBytes;
pub use error::{PoetError, Result};
pub use signup::{AttestationFacts, EnclaveQuote, SignupData};
pub use timer::WaitTimer;
pub use verify::verify_wait_certificate;

/// Length of a wait-certificate identifier, in hex characters.
pub const CERTIFICATE_ID_LENGTH: usize = 16;

/// The distinguished "no previous certificate" identifier used when
/// certifying the genesis block.
pub const NULL_IDENTIFIER: &str = "0000000000000000";

/// Floor for every generated wait duration, in seconds.
pub const MINIMUM_WAIT_TIME: f64 = 1.0;

/// Grace window after a timer expires during which it may still be
/// redeemed for a certificate, in seconds.
pub const TIMER_TIMEOUT_PERIOD: f64 = 30.0;

/// Bounds on the length of a validator address string.
pub const MIN_ADDRESS_LENGTH: usize = 26;
pub const MAX_ADDRESS_LENGTH: usize = 66;

/// Length of the random nonce embedded in each wait certificate, in bytes.
pub const CERTIFICATE_NONCE_LENGTH: usize = 32;
