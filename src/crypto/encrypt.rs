//! At-rest encryption for the vote mirror.
//!
//! Mirror payloads are sealed with AES-256-GCM under a service-wide key. The
//! AAD is bound to the mirror slot key (see [`crate::crypto::hash`]), so a
//! ciphertext only opens in the slot it was written to.
//!
//! Blob layout: `MIRROR_ATREST_MAGIC_V1 || nonce(12) || ciphertext_with_tag`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::crypto::hash::Hash256;

/// Encryption key (32 bytes for AES-256).
pub type EncryptionKey = [u8; 32];

/// Nonce size for AES-GCM (12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Magic prefix for encrypted mirror blobs (v1).
pub const MIRROR_ATREST_MAGIC_V1: &[u8; 4] = b"RVM1";

/// Error type for encryption operations.
#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("invalid ciphertext length")]
    InvalidCiphertext,

    #[error("invalid blob format")]
    InvalidBlobFormat,

    #[error("invalid encryption key: {0}")]
    InvalidKey(String),
}

/// Whether `data` looks like a v1 mirror blob.
pub fn is_mirror_blob(data: &[u8]) -> bool {
    data.len() >= MIRROR_ATREST_MAGIC_V1.len()
        && &data[..MIRROR_ATREST_MAGIC_V1.len()] == MIRROR_ATREST_MAGIC_V1
}

/// Encrypt bytes for storage at rest.
pub fn encrypt_at_rest(
    key: &EncryptionKey,
    aad: &Hash256,
    plaintext: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext_with_tag = cipher
        .encrypt(
            nonce,
            aes_gcm::aead::Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

    let mut blob =
        Vec::with_capacity(MIRROR_ATREST_MAGIC_V1.len() + NONCE_SIZE + ciphertext_with_tag.len());
    blob.extend_from_slice(MIRROR_ATREST_MAGIC_V1);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext_with_tag);
    Ok(blob)
}

/// Decrypt a blob produced by [`encrypt_at_rest`].
pub fn decrypt_at_rest(
    key: &EncryptionKey,
    aad: &Hash256,
    blob: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    let header_len = MIRROR_ATREST_MAGIC_V1.len() + NONCE_SIZE;
    if blob.len() < header_len + TAG_SIZE {
        return Err(EncryptionError::InvalidCiphertext);
    }
    if !is_mirror_blob(blob) {
        return Err(EncryptionError::InvalidBlobFormat);
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;

    let nonce_start = MIRROR_ATREST_MAGIC_V1.len();
    let nonce_end = nonce_start + NONCE_SIZE;
    let nonce = Nonce::from_slice(&blob[nonce_start..nonce_end]);

    cipher
        .decrypt(
            nonce,
            aes_gcm::aead::Payload {
                msg: &blob[nonce_end..],
                aad,
            },
        )
        .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))
}

/// Parse a 32-byte key from hex (optionally `0x`-prefixed) or base64.
pub fn parse_encryption_key(raw: &str) -> Result<EncryptionKey, EncryptionError> {
    let trimmed = raw.trim();
    let hex_str = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    if hex_str.len() == 64 && hex_str.chars().all(|c| c.is_ascii_hexdigit()) {
        let bytes = hex::decode(hex_str)
            .map_err(|e| EncryptionError::InvalidKey(format!("invalid hex: {e}")))?;
        return bytes
            .try_into()
            .map_err(|_| EncryptionError::InvalidKey("key must be 32 bytes".to_string()));
    }

    let bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, trimmed)
        .or_else(|_| {
            base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, trimmed)
        })
        .map_err(|e| EncryptionError::InvalidKey(format!("invalid base64: {e}")))?;

    bytes
        .try_into()
        .map_err(|_| EncryptionError::InvalidKey("key must be 32 bytes".to_string()))
}
