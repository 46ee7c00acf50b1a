//! The trusted half of the wait-certificate service.
//!
//! Everything in this crate conceptually runs inside the trust boundary:
//! the validator's signing key never leaves it in plaintext, the sealing
//! and delay-generation keys are derived from a platform secret that the
//! untrusted host cannot read, and the replay counter store is owned
//! exclusively by this module. The untrusted host talks to it only
//! through the operations on [`Enclave`].

pub mod attestation;
pub mod certificate;
pub mod counter;
pub mod duration;
pub mod identity;
pub mod sealing;
pub mod signup;
pub mod time;
pub mod timer;

use std::path::Path;

use shared::signup::AttestationFacts;
use shared::{PoetError, Result};

use crate::attestation::{AttestationProvider, SimulatedAttestation};
use crate::counter::CounterStore;
use crate::identity::ValidatorIdentity;
use crate::sealing::PlatformKeys;
use crate::time::{SystemClock, TrustedTime};

const COUNTER_DB: &str = "counters.db3";

/// The loaded trusted subsystem.
///
/// Modeled as a process-exclusive resource: all operations take `&mut
/// self`, and the session manager on the untrusted side serializes access
/// behind a lock. One instance owns the platform keys, the durable replay
/// counter store, and the trusted time source.
pub struct Enclave {
    keys: PlatformKeys,
    counters: CounterStore,
    clock: Box<dyn TrustedTime>,
    attestation: SimulatedAttestation,
}

impl Enclave {
    /// Load the trusted subsystem from its data directory, creating the
    /// platform secret and counter store on first use.
    pub fn open(data_dir: &Path) -> Result<Self> {
        Self::open_with_clock(data_dir, Box::new(SystemClock))
    }

    /// Load with a caller-supplied trusted time source. Production code
    /// uses [`open`](Self::open); tests drive expiry windows through a
    /// manual clock.
    pub fn open_with_clock(data_dir: &Path, clock: Box<dyn TrustedTime>) -> Result<Self> {
        if !data_dir.is_dir() {
            return Err(PoetError::InvalidArgument(format!(
                "data directory does not exist: {}",
                data_dir.display()
            )));
        }
        let keys = PlatformKeys::load_or_create(data_dir)?;
        let counters = CounterStore::open(&data_dir.join(COUNTER_DB))?;
        let attestation = SimulatedAttestation::new(&keys);
        tracing::info!(data_dir = %data_dir.display(), "trusted subsystem loaded");
        Ok(Self {
            keys,
            counters,
            clock,
            attestation,
        })
    }

    /// The hardware-derived facts external attestation flows consume.
    pub fn attestation_facts(&self) -> AttestationFacts {
        self.attestation.facts()
    }

    /// Unseal a validator identity and check that its replay counter is
    /// still live and agrees with the sealed snapshot. A counter that has
    /// been destroyed, or that has advanced past the sealed value,
    /// indicates a stale or replayed blob; the identity is then no longer
    /// valid and the validator must re-run signup.
    pub(crate) fn unseal_identity(&self, sealed: &[u8]) -> Result<ValidatorIdentity> {
        let identity = ValidatorIdentity::unseal(&self.keys, sealed)?;
        match self.counters.read(&identity.counter_id)? {
            None => Err(PoetError::IntegrityError(
                "replay counter no longer exists".to_string(),
            )),
            Some(live) if live != identity.counter_value => Err(PoetError::IntegrityError(format!(
                "replay counter disagrees with sealed snapshot ({live} != {})",
                identity.counter_value
            ))),
            Some(_) => Ok(identity),
        }
    }
}
