//! Sealing and opening using PBKDF2-HMAC-SHA256 + AES-256-GCM
//!
//! This module implements per-value authenticated encryption:
//! - PBKDF2 (HMAC-SHA256, 100k rounds) derives a fresh key from the master
//!   secret and a random salt on every call
//! - AES-256-GCM with a 16-byte nonce seals the value
//!
//! The binary format is:
//! - salt: 64 bytes
//! - nonce: 16 bytes
//! - tag: 16 bytes (GCM authentication tag)
//! - ciphertext: variable length, same as the plaintext
//!
//! The 16-byte nonce differs from the common 12-byte GCM choice. Existing
//! stored values depend on it, so it must not change without a migration.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{CredsealError, ErrorCategory, ErrorKind, Result};

/// Length of salt in bytes
pub const SALT_LEN: usize = 64;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 16;

/// Length of the GCM authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// Smallest possible sealed value: salt, nonce and tag around an empty
/// ciphertext.
pub const MIN_SEALED_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// PBKDF2 iteration count
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// AES-256-GCM with a 128-bit nonce.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Derive a 32-byte key from the master secret and salt using PBKDF2
///
/// The key is wiped when the returned value is dropped; callers must not
/// keep it beyond the current call.
pub fn derive_key(secret: &[u8], salt: &[u8; SALT_LEN]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    if secret.is_empty() {
        return Err(CredsealError::configuration("master secret is empty"));
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(secret, salt, PBKDF2_ROUNDS, &mut key[..]);

    Ok(key)
}

fn build_cipher(key: &[u8; KEY_LEN]) -> Option<Aes256Gcm16> {
    Aes256Gcm16::new_from_slice(key).ok()
}

/// Seal plaintext under the master secret using random salt and nonce
///
/// Returns the binary format: salt(64) + nonce(16) + tag(16) + ciphertext(variable)
pub fn seal(secret: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .and_then(|()| OsRng.try_fill_bytes(&mut nonce))
        .map_err(|e| {
            CredsealError::with_source(
                ErrorCategory::Internal,
                ErrorKind::Encryption,
                "random source unavailable",
                e,
            )
        })?;

    seal_deterministic(secret, plaintext, &salt, &nonce)
}

/// Seal plaintext under the master secret using provided salt and nonce
///
/// This function is ONLY for known-answer tests. Reusing a salt and nonce
/// pair destroys the confidentiality of GCM; production code goes through
/// [`seal`], which draws both from the OS.
pub fn seal_deterministic(
    secret: &[u8],
    plaintext: &[u8],
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<Vec<u8>> {
    let key = derive_key(secret, salt)?;
    let cipher = build_cipher(&key).ok_or_else(|| CredsealError::encryption("invalid key"))?;

    let mut output = Vec::with_capacity(MIN_SEALED_LEN + plaintext.len());
    output.extend_from_slice(salt);
    output.extend_from_slice(nonce);
    output.extend_from_slice(&[0u8; TAG_LEN]); // filled in below
    output.extend_from_slice(plaintext);

    let tag = cipher
        .encrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            b"",
            &mut output[MIN_SEALED_LEN..],
        )
        .map_err(|_| CredsealError::encryption("encryption failed"))?;
    output[SALT_LEN + NONCE_LEN..MIN_SEALED_LEN].copy_from_slice(&tag);

    Ok(output)
}

/// Open a sealed value with the master secret
///
/// Every failure related to the input (too short, wrong secret, tampered
/// bytes) is the same [`ErrorKind::Decryption`] error. Input shorter than
/// [`MIN_SEALED_LEN`] is rejected before any key derivation happens.
pub fn open(secret: &[u8], sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < MIN_SEALED_LEN {
        return Err(CredsealError::decryption());
    }

    let (salt, rest) = sealed.split_at(SALT_LEN);
    let (nonce, rest) = rest.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);
    let salt: &[u8; SALT_LEN] = salt.try_into().map_err(|_| CredsealError::decryption())?;

    let key = derive_key(secret, salt)?;
    let cipher = build_cipher(&key).ok_or_else(CredsealError::decryption)?;

    let mut plaintext = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            b"",
            &mut plaintext,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| CredsealError::decryption())?;

    Ok(plaintext)
}
