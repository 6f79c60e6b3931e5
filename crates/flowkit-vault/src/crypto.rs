//! AES-256-GCM encryption primitives built on `ring`.
//!
//! Credential plaintext is sealed with a process-wide 256-bit master key and
//! a fresh random 96-bit nonce per encryption; the GCM authentication tag
//! makes any tampering (or a wrong key) fail loudly at decryption time.
//! A PBKDF2-HMAC-SHA256 helper derives the master key from a passphrase
//! when the embedding process does not manage raw key bytes itself.

use ring::aead::{self, Aad, BoundKey, NONCE_LEN, Nonce, NonceSequence, SealingKey, UnboundKey};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{Result, VaultError};

/// Length of the AES-256-GCM master key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of the GCM nonce in bytes (96 bits).
pub const NONCE_LEN_BYTES: usize = NONCE_LEN;

/// Length of the PBKDF2 salt in bytes.
pub const SALT_LEN: usize = 32;

/// PBKDF2-HMAC-SHA256 iteration count.
const PBKDF2_ITERATIONS: u32 = 600_000;

static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;
static AEAD_ALG: &aead::Algorithm = &aead::AES_256_GCM;

// ---------------------------------------------------------------------------
// Nonce handling
// ---------------------------------------------------------------------------

/// Nonce sequence that hands out its nonce exactly once.
///
/// `ring` drives sealing/opening through a [`NonceSequence`]; each key here
/// is built for a single operation with a nonce chosen up front, so the
/// sequence is exhausted after one advance.
struct OneShotNonce(Option<[u8; NONCE_LEN_BYTES]>);

impl NonceSequence for OneShotNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.0
            .take()
            .map(Nonce::assume_unique_for_key)
            .ok_or(ring::error::Unspecified)
    }
}

// ---------------------------------------------------------------------------
// Encrypt / decrypt
// ---------------------------------------------------------------------------

/// Encrypt `plaintext` under the 256-bit `key`.
///
/// Returns `(nonce, ciphertext)`; the ciphertext carries the 128-bit GCM
/// tag appended by `ring`.
///
/// # Errors
///
/// Returns [`VaultError::EncryptionFailed`] on a wrong key length or an RNG
/// failure.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<([u8; NONCE_LEN_BYTES], Vec<u8>)> {
    check_key_len(key).map_err(|reason| VaultError::EncryptionFailed { reason })?;

    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; NONCE_LEN_BYTES];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| VaultError::EncryptionFailed {
            reason: "failed to generate random nonce".into(),
        })?;

    let unbound = UnboundKey::new(AEAD_ALG, key).map_err(|_| VaultError::EncryptionFailed {
        reason: "failed to create AES-256-GCM key".into(),
    })?;
    let mut sealing_key = SealingKey::new(unbound, OneShotNonce(Some(nonce_bytes)));

    let mut in_out = plaintext.to_vec();
    sealing_key
        .seal_in_place_append_tag(Aad::empty(), &mut in_out)
        .map_err(|_| VaultError::EncryptionFailed {
            reason: "seal_in_place failed".into(),
        })?;

    tracing::trace!(
        plaintext_len = plaintext.len(),
        ciphertext_len = in_out.len(),
        "sealed credential data"
    );

    Ok((nonce_bytes, in_out))
}

/// Decrypt `ciphertext` (tag included) with `nonce` and the 256-bit `key`.
///
/// # Errors
///
/// Returns [`VaultError::DecryptionFailed`] if the key is wrong or the
/// ciphertext fails authentication.
pub fn decrypt(nonce: &[u8; NONCE_LEN_BYTES], ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    check_key_len(key).map_err(|reason| VaultError::DecryptionFailed { reason })?;

    let unbound = UnboundKey::new(AEAD_ALG, key).map_err(|_| VaultError::DecryptionFailed {
        reason: "failed to create AES-256-GCM key".into(),
    })?;
    let mut opening_key = aead::OpeningKey::new(unbound, OneShotNonce(Some(*nonce)));

    let mut in_out = ciphertext.to_vec();
    let plaintext = opening_key
        .open_in_place(Aad::empty(), &mut in_out)
        .map_err(|_| VaultError::DecryptionFailed {
            reason: "authentication failed — wrong key or corrupted data".into(),
        })?;

    Ok(plaintext.to_vec())
}

fn check_key_len(key: &[u8]) -> std::result::Result<(), String> {
    if key.len() == KEY_LEN {
        Ok(())
    } else {
        Err(format!("key must be {} bytes, got {}", KEY_LEN, key.len()))
    }
}

// ---------------------------------------------------------------------------
// Key material
// ---------------------------------------------------------------------------

/// Generate a random 256-bit master key.
///
/// # Errors
///
/// Returns [`VaultError::EncryptionFailed`] if the system CSPRNG fails.
pub fn generate_key() -> Result<[u8; KEY_LEN]> {
    let rng = SystemRandom::new();
    let mut key = [0u8; KEY_LEN];
    rng.fill(&mut key).map_err(|_| VaultError::EncryptionFailed {
        reason: "failed to generate random key".into(),
    })?;
    Ok(key)
}

/// Derive a 256-bit master key from `passphrase` and a known `salt` using
/// PBKDF2-HMAC-SHA256.
///
/// Deterministic: the same passphrase and salt always produce the same key,
/// so the caller only needs to persist the salt.
pub fn derive_key(passphrase: &[u8], salt: &[u8]) -> [u8; KEY_LEN] {
    let iterations =
        std::num::NonZeroU32::new(PBKDF2_ITERATIONS).expect("PBKDF2_ITERATIONS is non-zero");
    let mut key = [0u8; KEY_LEN];
    pbkdf2::derive(PBKDF2_ALG, iterations, salt, passphrase, &mut key);
    key
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
