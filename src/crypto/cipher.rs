//! Authenticated stream cipher oracle keyed by the SRP shared secret.
//!
//! The session key is derived from the raw shared secret `K` with
//! `Hkdf<Sha256>`; messages are sealed with `ChaCha20Poly1305`. Nonces are
//! derived from a per-direction monotonically increasing counter rather than
//! randomly generated, since only a handful of messages (the session
//! challenge/response) are ever sealed with a single derived key.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("key derivation failed")]
    KeyDerivation,
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed (ciphertext or associated data mismatch)")]
    Decrypt,
}

/// A session key derived from the SRP shared secret, ready to seal or open
/// authenticated messages.
#[derive(Clone)]
pub struct SessionCipher {
    cipher: ChaCha20Poly1305,
}

impl SessionCipher {
    /// Derives a session cipher from the raw SRP shared secret using
    /// HKDF-SHA256 with the given context info.
    pub fn derive(shared_secret: &[u8], info: &[u8]) -> Result<Self, CipherError> {
        let hk = Hkdf::<Sha256>::new(None, shared_secret);
        let mut key_bytes = [0u8; 32];
        hk.expand(info, &mut key_bytes)
            .map_err(|_| CipherError::KeyDerivation)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key_bytes));
        Ok(Self { cipher })
    }

    /// Seals `plaintext` under the given 64-bit counter and associated data.
    pub fn seal(
        &self,
        counter: u64,
        associated_data: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        let nonce = nonce_from_counter(counter);
        self.cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext,
                    aad: associated_data,
                },
            )
            .map_err(|_| CipherError::Encrypt)
    }

    /// Opens a ciphertext sealed with [`SessionCipher::seal`] under the same
    /// counter and associated data.
    pub fn open(
        &self,
        counter: u64,
        associated_data: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        let nonce = nonce_from_counter(counter);
        self.cipher
            .decrypt(
                &nonce,
                Payload {
                    msg: ciphertext,
                    aad: associated_data,
                },
            )
            .map_err(|_| CipherError::Decrypt)
    }
}

fn nonce_from_counter(counter: u64) -> Nonce {
    let mut bytes = [0u8; 12];
    bytes[4..].copy_from_slice(&counter.to_be_bytes());
    *Nonce::from_slice(&bytes)
}
