//! Deterministic wait-duration generation.
//!
//! The duration is a keyed MAC over the validator address and previous
//! certificate id, mapped onto an exponential distribution. Without the
//! platform secret the draw is unpredictable, yet the same trusted logic
//! can recompute it exactly, which is what lets a certificate be checked
//! without re-running the random draw.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use shared::MINIMUM_WAIT_TIME;

use crate::sealing::PlatformKeys;

const DURATION_LABEL: &[u8] = b"tempo-duration";

/// Compute the wait duration for `(validator_address,
/// previous_certificate_id, local_mean)` under this platform's secret.
///
/// The MAC's first 8 bytes, normalized to `(0, 1]`, feed
/// `MINIMUM_WAIT_TIME - local_mean * ln(p)`: an exponential distribution
/// with rate `1 / local_mean`, floored at the minimum wait time. The
/// caller-supplied request time never enters the computation.
pub fn generate_duration(
    keys: &PlatformKeys,
    validator_address: &str,
    previous_certificate_id: &str,
    local_mean: f64,
) -> f64 {
    let key = keys.derive(DURATION_LABEL);
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&key).expect("HMAC accepts any key length");
    mac.update(validator_address.as_bytes());
    mac.update(previous_certificate_id.as_bytes());
    let tag = mac.finalize().into_bytes();

    let v = u64::from_le_bytes(tag[..8].try_into().expect("tag is at least 8 bytes"));
    // a zero prefix would put ln at -inf
    let p = (v as f64 / u64::MAX as f64).max(f64::MIN_POSITIVE);

    MINIMUM_WAIT_TIME - local_mean * p.ln()
}
