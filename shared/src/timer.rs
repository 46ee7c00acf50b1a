//! The signed wait-timer payload.

use serde::{Deserialize, Serialize};

use crate::error::{PoetError, Result};
use crate::{HexBytes, TIMER_TIMEOUT_PERIOD};

/// A signed commitment by a validator to a specific randomized delay.
///
/// Created by the trusted timer issuer and consumed exactly once by the
/// certificate issuer; opaque to the untrusted caller in between. The
/// struct fields are declared in alphabetical key order so that
/// serialization is canonical and signatures are reproducible
/// byte-for-byte.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitTimer {
    /// The randomized wait duration, in seconds. A deterministic function
    /// of the validator address, the previous certificate id, and the
    /// local mean; never of the request time.
    #[serde(rename = "Duration")]
    pub duration: f64,
    /// The caller-supplied local mean wait time for the network.
    #[serde(rename = "LocalMean")]
    pub local_mean: f64,
    /// Identifier of the previous wait certificate, or the null
    /// identifier for the genesis case.
    #[serde(rename = "PreviousCertID")]
    pub previous_certificate_id: String,
    /// Caller-supplied wall-clock time of the request.
    #[serde(rename = "RequestTime")]
    pub request_time: f64,
    /// Snapshot of the replay counter at creation time. The certificate
    /// issuer rejects the timer if the counter has advanced since.
    #[serde(rename = "SequenceId")]
    pub sequence_id: u32,
    /// Trusted-time snapshot taken when the timer was issued.
    #[serde(rename = "TrustedRequestTime")]
    pub trusted_request_time: f64,
    /// Address of the validator the timer was issued to.
    #[serde(rename = "ValidatorAddress")]
    pub validator_address: String,
}

impl WaitTimer {
    /// Serialize to the canonical key-sorted JSON form that gets signed.
    pub fn serialize(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| PoetError::PlatformFault(format!("wait timer serialization failed: {e}")))
    }

    pub fn deserialize(serialized: &str) -> Result<Self> {
        serde_json::from_str(serialized)
            .map_err(|e| PoetError::InvalidArgument(format!("failed to parse wait timer: {e}")))
    }

    /// The earliest trusted time at which the timer may be redeemed.
    /// Floored, giving the certificate the benefit of partially elapsed
    /// seconds.
    pub fn expire_time(&self) -> f64 {
        (self.trusted_request_time + self.duration).floor()
    }

    /// The trusted time after which the timer can no longer be redeemed.
    /// Ceiled, again to the certificate's benefit.
    pub fn timeout_time(&self) -> f64 {
        (self.trusted_request_time + self.duration + TIMER_TIMEOUT_PERIOD).ceil()
    }
}

/// A serialized wait timer together with the signature over its exact
/// serialized bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTimer {
    pub serialized: String,
    pub signature: HexBytes<64>,
}
