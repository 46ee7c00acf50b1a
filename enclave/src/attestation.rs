//! Attestation facts and quote production.
//!
//! The attestation provider is the seam behind which real quoting
//! infrastructure would sit; the simulated provider derives stable facts
//! from the platform secret so that two loads of the same installation
//! attest identically while distinct installations do not.

use shared::signup::{AttestationFacts, EnclaveQuote};
use shared::{HexBytes, Result};

use crate::sealing::PlatformKeys;

const MEASUREMENT_LABEL: &[u8] = b"tempo-measurement";
const BASENAME_LABEL: &[u8] = b"tempo-basename";
const MANIFEST_LABEL: &[u8] = b"tempo-platform-manifest";

/// Produces quotes and the read-only facts external attestation flows
/// consume.
pub trait AttestationProvider {
    fn facts(&self) -> AttestationFacts;

    /// Produce a serialized quote embedding the given report data.
    fn quote(&self, report_data: HexBytes<32>) -> Result<String>;
}

/// Software stand-in for the hardware quoting enclave.
pub struct SimulatedAttestation {
    measurement: HexBytes<32>,
    basename: HexBytes<32>,
    manifest_hash: HexBytes<32>,
}

impl SimulatedAttestation {
    pub fn new(keys: &PlatformKeys) -> Self {
        Self {
            measurement: HexBytes(keys.derive(MEASUREMENT_LABEL)),
            basename: HexBytes(keys.derive(BASENAME_LABEL)),
            manifest_hash: HexBytes(keys.derive(MANIFEST_LABEL)),
        }
    }
}

impl AttestationProvider for SimulatedAttestation {
    fn facts(&self) -> AttestationFacts {
        AttestationFacts {
            measurement: self.measurement,
            basename: self.basename,
            manifest_hash: self.manifest_hash,
        }
    }

    fn quote(&self, report_data: HexBytes<32>) -> Result<String> {
        EnclaveQuote {
            basename: self.basename,
            measurement: self.measurement,
            report_data,
        }
        .serialize()
    }
}
