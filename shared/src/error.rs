//! Error taxonomy for the wait-certificate protocol.
//!
//! Every boundary operation returns a discriminated [`Result`] rather than
//! panicking across the trust boundary. Each rejection path carries a
//! distinct, stably-named variant so calling consensus logic can tell
//! "try again later" apart from "this peer cheated".

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PoetError>;

#[derive(Error, Debug)]
pub enum PoetError {
    /// Null, malformed, or out-of-range input. Always the caller's fault,
    /// never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Sealed data failed its freshness or rollback check. Fatal to the
    /// identity; the validator must re-run signup.
    #[error("sealed identity is no longer valid: {0}")]
    IntegrityError(String),

    /// A signature did not verify against the claimed public key.
    #[error("signature is invalid")]
    InvalidSignature,

    /// The replay counter did not match the timer's sequence snapshot.
    #[error("wait timer out of sequence (possible replay attack)")]
    SequenceViolation,

    /// A certificate was requested before the timer's delay elapsed.
    #[error("wait timer has not expired")]
    TimerNotExpired,

    /// A certificate was requested after the timer's timeout window closed.
    #[error("wait timer has timed out")]
    TimerExpired,

    /// Signup information did not match the attested facts.
    #[error("signup verification failed: {0}")]
    SignupMismatch(String),

    /// The trusted subsystem is temporarily busy. Retried with bounded
    /// backoff by the session manager.
    #[error("trusted subsystem is busy")]
    PlatformBusy,

    /// The trusted subsystem was torn down unexpectedly. The session
    /// manager reloads it once and retries the in-flight call once.
    #[error("trusted subsystem was lost")]
    IdentityLost,

    /// Unexpected lower-layer failure. Logged with context and surfaced
    /// as fatal.
    #[error("platform fault: {0}")]
    PlatformFault(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl PoetError {
    /// Whether the session manager may transparently recover from this
    /// error. Everything else propagates unchanged to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PlatformBusy | Self::IdentityLost)
    }
}
