//! Session management for the trusted subsystem.
//!
//! The subsystem is a process-exclusive resource: one loaded instance,
//! all calls serialized behind a lock. The session manager owns the
//! recovery policy for the two transient failure modes: a busy platform
//! is retried a bounded number of times with a fixed delay, and a lost
//! subsystem is reloaded once with the in-flight call retried once.
//! Every other error passes through unchanged.

use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use shared::certificate::CertificateBundle;
use shared::signup::{AttestationFacts, SignupData};
use shared::timer::SignedTimer;
use shared::{HexBytes, PoetError, Result};

/// The operations the trusted subsystem exposes to the untrusted side.
pub trait TrustedService {
    fn create_signup_data(&mut self, originator_hash: &str) -> Result<SignupData>;

    fn unseal_signup_data(&mut self, sealed_identity: &[u8]) -> Result<HexBytes<32>>;

    fn release_signup_data(&mut self, sealed_identity: &[u8]) -> Result<()>;

    fn create_wait_timer(
        &mut self,
        sealed_identity: &[u8],
        validator_address: &str,
        previous_certificate_id: &str,
        request_time: f64,
        local_mean: f64,
    ) -> Result<SignedTimer>;

    fn create_wait_certificate(
        &mut self,
        sealed_identity: &[u8],
        serialized_timer: &str,
        timer_signature: &HexBytes<64>,
        block_hash: &str,
    ) -> Result<CertificateBundle>;

    fn verify_signup_info(
        &mut self,
        originator_hash: &str,
        public_key: &HexBytes<32>,
        quote: &str,
        manifest_hash: &HexBytes<32>,
    ) -> Result<()>;

    fn attestation_facts(&mut self) -> Result<AttestationFacts>;
}

impl TrustedService for enclave::Enclave {
    fn create_signup_data(&mut self, originator_hash: &str) -> Result<SignupData> {
        enclave::Enclave::create_signup_data(self, originator_hash)
    }

    fn unseal_signup_data(&mut self, sealed_identity: &[u8]) -> Result<HexBytes<32>> {
        enclave::Enclave::unseal_signup_data(self, sealed_identity)
    }

    fn release_signup_data(&mut self, sealed_identity: &[u8]) -> Result<()> {
        enclave::Enclave::release_signup_data(self, sealed_identity)
    }

    fn create_wait_timer(
        &mut self,
        sealed_identity: &[u8],
        validator_address: &str,
        previous_certificate_id: &str,
        request_time: f64,
        local_mean: f64,
    ) -> Result<SignedTimer> {
        enclave::Enclave::create_wait_timer(
            self,
            sealed_identity,
            validator_address,
            previous_certificate_id,
            request_time,
            local_mean,
        )
    }

    fn create_wait_certificate(
        &mut self,
        sealed_identity: &[u8],
        serialized_timer: &str,
        timer_signature: &HexBytes<64>,
        block_hash: &str,
    ) -> Result<CertificateBundle> {
        enclave::Enclave::create_wait_certificate(
            self,
            sealed_identity,
            serialized_timer,
            timer_signature,
            block_hash,
        )
    }

    fn verify_signup_info(
        &mut self,
        originator_hash: &str,
        public_key: &HexBytes<32>,
        quote: &str,
        manifest_hash: &HexBytes<32>,
    ) -> Result<()> {
        enclave::Enclave::verify_signup_info(self, originator_hash, public_key, quote, manifest_hash)
    }

    fn attestation_facts(&mut self) -> Result<AttestationFacts> {
        Ok(enclave::Enclave::attestation_facts(self))
    }
}

/// Loads (and on identity loss, reloads) a trusted service instance.
pub trait ServiceLoader {
    type Service: TrustedService;

    fn load(&self) -> Result<Self::Service>;
}

/// Loads the in-process trusted subsystem from its data directory.
pub struct EnclaveLoader {
    pub data_dir: PathBuf,
}

impl ServiceLoader for EnclaveLoader {
    type Service = enclave::Enclave;

    fn load(&self) -> Result<Self::Service> {
        enclave::Enclave::open(&self.data_dir)
    }
}

pub struct SessionManager<L: ServiceLoader> {
    loader: L,
    service: Mutex<L::Service>,
    retry_count: u32,
    retry_delay: Duration,
}

impl<L: ServiceLoader> SessionManager<L> {
    /// Load the trusted service and wrap it in a session.
    pub fn start(loader: L, retry_count: u32, retry_delay: Duration) -> Result<Self> {
        let service = loader.load()?;
        Ok(Self {
            loader,
            service: Mutex::new(service),
            retry_count,
            retry_delay,
        })
    }

    /// Run one boundary call under the recovery policy. The lock is held
    /// for the whole call including retries, so recovery never interleaves
    /// with another caller's operation.
    fn call<T>(&self, mut op: impl FnMut(&mut L::Service) -> Result<T>) -> Result<T> {
        let mut guard = self
            .service
            .lock()
            .map_err(|_| PoetError::PlatformFault("session lock poisoned".to_string()))?;
        let mut busy_left = self.retry_count;
        let mut reloaded = false;
        loop {
            match op(&mut *guard) {
                Err(PoetError::PlatformBusy) if busy_left > 0 => {
                    busy_left -= 1;
                    tracing::debug!(remaining = busy_left, "trusted subsystem busy, retrying");
                    thread::sleep(self.retry_delay);
                }
                Err(PoetError::IdentityLost) if !reloaded => {
                    reloaded = true;
                    tracing::warn!("trusted subsystem lost, reloading");
                    *guard = self.loader.load()?;
                }
                other => return other,
            }
        }
    }

    pub fn create_signup_data(&self, originator_hash: &str) -> Result<SignupData> {
        self.call(|service| service.create_signup_data(originator_hash))
    }

    pub fn unseal_signup_data(&self, sealed_identity: &[u8]) -> Result<HexBytes<32>> {
        self.call(|service| service.unseal_signup_data(sealed_identity))
    }

    pub fn release_signup_data(&self, sealed_identity: &[u8]) -> Result<()> {
        self.call(|service| service.release_signup_data(sealed_identity))
    }

    pub fn create_wait_timer(
        &self,
        sealed_identity: &[u8],
        validator_address: &str,
        previous_certificate_id: &str,
        request_time: f64,
        local_mean: f64,
    ) -> Result<SignedTimer> {
        self.call(|service| {
            service.create_wait_timer(
                sealed_identity,
                validator_address,
                previous_certificate_id,
                request_time,
                local_mean,
            )
        })
    }

    pub fn create_wait_certificate(
        &self,
        sealed_identity: &[u8],
        serialized_timer: &str,
        timer_signature: &HexBytes<64>,
        block_hash: &str,
    ) -> Result<CertificateBundle> {
        self.call(|service| {
            service.create_wait_certificate(
                sealed_identity,
                serialized_timer,
                timer_signature,
                block_hash,
            )
        })
    }

    pub fn verify_signup_info(
        &self,
        originator_hash: &str,
        public_key: &HexBytes<32>,
        quote: &str,
        manifest_hash: &HexBytes<32>,
    ) -> Result<()> {
        self.call(|service| service.verify_signup_info(originator_hash, public_key, quote, manifest_hash))
    }

    pub fn attestation_facts(&self) -> Result<AttestationFacts> {
        self.call(|service| service.attestation_facts())
    }
}
