//! The trusted time source used for expiry-window checks.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use shared::{PoetError, Result};

/// A tamper-resistant time source, in seconds.
///
/// The hardware platform provided a trusted clock; this seam lets the
/// certificate issuer read time without caring whether the backing is
/// real hardware, the system clock, or a test double.
pub trait TrustedTime: Send {
    fn now(&self) -> Result<f64>;
}

/// Production clock: seconds since the Unix epoch.
pub struct SystemClock;

impl TrustedTime for SystemClock {
    fn now(&self) -> Result<f64> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .map_err(|e| PoetError::PlatformFault(format!("system clock is before epoch: {e}")))
    }
}

/// A hand-adjustable clock for driving expiry windows in tests.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, now: f64) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, seconds: f64) {
        *self.now.lock().unwrap() += seconds;
    }
}

impl TrustedTime for ManualClock {
    fn now(&self) -> Result<f64> {
        Ok(*self.now.lock().unwrap())
    }
}
