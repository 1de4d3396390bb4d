//! Reversible encryption of teacher access codes.
//!
//! Tokens have the form `hex(nonce):hex(ciphertext)`, so a token plus the shared
//! secret is all `decrypt` needs. AES-256-GCM is authenticated: a token produced
//! under another secret, or tampered with, fails instead of yielding garbage.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use secrecy::{ExposeSecret, Secret};
use std::fmt;
use thiserror::Error;

/// Size of the derived key in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),
}

#[derive(Clone)]
pub struct AccessCodeCipher {
    key: [u8; KEY_SIZE],
}

impl fmt::Debug for AccessCodeCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCodeCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl AccessCodeCipher {
    pub fn new(secret: &Secret<String>) -> Self {
        Self {
            key: derive_key(secret.expose_secret()),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .aead()
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| CipherError::Encryption(e.to_string()))?;

        Ok(format!(
            "{}:{}",
            hex::encode(nonce_bytes),
            hex::encode(ciphertext)
        ))
    }

    pub fn decrypt(&self, token: &str) -> Result<String, CipherError> {
        let (nonce_hex, ciphertext_hex) = token
            .split_once(':')
            .ok_or_else(|| CipherError::Decryption("missing nonce separator".to_string()))?;

        let nonce_bytes = hex::decode(nonce_hex)
            .map_err(|e| CipherError::Decryption(format!("bad nonce encoding: {}", e)))?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(CipherError::Decryption(format!(
                "nonce must be {} bytes, got {}",
                NONCE_SIZE,
                nonce_bytes.len()
            )));
        }
        let ciphertext = hex::decode(ciphertext_hex)
            .map_err(|e| CipherError::Decryption(format!("bad ciphertext encoding: {}", e)))?;

        let plaintext = self
            .aead()
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|_| CipherError::Decryption("authentication failed".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| CipherError::Decryption(format!("plaintext is not UTF-8: {}", e)))
    }

    fn aead(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key))
    }
}

/// Fill a fixed-width key by repeating the secret's bytes; longer secrets are
/// truncated. An empty secret yields the all-zero key.
fn derive_key(secret: &str) -> [u8; KEY_SIZE] {
    let bytes = secret.as_bytes();
    let mut key = [0u8; KEY_SIZE];
    if !bytes.is_empty() {
        for (i, slot) in key.iter_mut().enumerate() {
            *slot = bytes[i % bytes.len()];
        }
    }
    key
}
