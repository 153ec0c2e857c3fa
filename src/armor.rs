//! Text armoring for sealed values
//!
//! Sealed bytes are stored as standard base64 (with padding) and nothing
//! else: no prefix, no version marker, no whitespace. Values written before
//! sealing existed are plain text in the same column, so [`looks_encrypted`]
//! has to tell the two apart by shape alone.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::{CredsealError, Result};
use crate::secretcrypt::MIN_SEALED_LEN;

/// Wrap sealed bytes in armor, returning the stored text form
pub fn wrap(body: &[u8]) -> String {
    STANDARD.encode(body)
}

/// Unwrap armored text, returning the sealed bytes
///
/// Invalid base64 is a decryption failure like any other malformed input.
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(armored)
        .map_err(|_| CredsealError::decryption())
}

/// Best-effort check whether a stored value is already sealed
///
/// True only when `value` is valid base64, decodes to at least
/// [`MIN_SEALED_LEN`] bytes, and re-encodes to exactly `value`.
///
/// False positives are possible: a long legacy plaintext made solely of
/// base64 characters with canonical padding passes all three checks and will
/// then fail to decrypt. That risk is accepted for one-time migration.
pub fn looks_encrypted(value: &str) -> bool {
    match STANDARD.decode(value) {
        Ok(bytes) => bytes.len() >= MIN_SEALED_LEN && STANDARD.encode(&bytes) == value,
        Err(_) => false,
    }
}
