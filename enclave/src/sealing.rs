//! Sealing: authenticated encryption under an identity-derived key.
//!
//! A 32-byte platform secret stands in for the hardware sealing material;
//! it is generated once per installation and every purpose-specific key
//! (sealing, delay generation, attestation facts) is derived from it via
//! HKDF, so nothing sealed by one installation can be opened by another.

use std::fs;
use std::path::Path;

use chacha20poly1305::aead::Aead;
use chacha20poly1305::{AeadCore, ChaCha20Poly1305, Key, KeyInit, Nonce};
use hkdf::Hkdf;
use rand_core::{OsRng, RngCore};
use sha2::Sha256;

use shared::{PoetError, Result};

pub(crate) const PLATFORM_SECRET_FILE: &str = "platform.key";
const SEALING_LABEL: &[u8] = b"tempo-identity-sealing";
const NONCE_LEN: usize = 12;

/// The per-installation secret and the keys derived from it.
pub struct PlatformKeys {
    secret: [u8; 32],
}

impl PlatformKeys {
    /// Read the platform secret from the data directory, generating and
    /// persisting a fresh one on first use.
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(PLATFORM_SECRET_FILE);
        let secret = if path.exists() {
            let bytes = fs::read(&path)
                .map_err(|e| PoetError::PlatformFault(format!("failed to read {path:?}: {e}")))?;
            <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
                PoetError::IntegrityError("platform secret has the wrong length".to_string())
            })?
        } else {
            let mut secret = [0u8; 32];
            OsRng.fill_bytes(&mut secret);
            fs::write(&path, secret)
                .map_err(|e| PoetError::PlatformFault(format!("failed to write {path:?}: {e}")))?;
            tracing::info!(path = %path.display(), "generated fresh platform secret");
            secret
        };
        Ok(Self { secret })
    }

    /// Derive a purpose-bound 32-byte key from the platform secret.
    pub fn derive(&self, label: &[u8]) -> [u8; 32] {
        let hk = Hkdf::<Sha256>::new(None, &self.secret);
        let mut out = [0u8; 32];
        hk.expand(label, &mut out)
            .expect("32 bytes is a valid HKDF output length");
        out
    }

    /// Seal a payload: encrypt-and-tag it under the sealing key. The
    /// result is opaque to the untrusted caller and can only be opened by
    /// the same installation.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = self.sealing_cipher();
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| PoetError::PlatformFault("sealing failed".to_string()))?;
        let mut blob = nonce.to_vec();
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Open a sealed blob, rejecting anything that was not produced by
    /// this installation or has been tampered with.
    pub fn unseal(&self, blob: &[u8]) -> Result<Vec<u8>> {
        if blob.len() <= NONCE_LEN {
            return Err(PoetError::IntegrityError(
                "sealed blob is too short".to_string(),
            ));
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        self.sealing_cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                PoetError::IntegrityError("sealed blob failed its integrity check".to_string())
            })
    }

    fn sealing_cipher(&self) -> ChaCha20Poly1305 {
        let key = self.derive(SEALING_LABEL);
        ChaCha20Poly1305::new(Key::from_slice(&key))
    }
}
