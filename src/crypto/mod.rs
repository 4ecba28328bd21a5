//! Cryptographic utilities: mirror key derivation and at-rest encryption.

pub mod encrypt;
pub mod hash;

pub use encrypt::{
    decrypt_at_rest, encrypt_at_rest, is_mirror_blob, parse_encryption_key, EncryptionError,
    EncryptionKey, MIRROR_ATREST_MAGIC_V1, NONCE_SIZE, TAG_SIZE,
};
pub use hash::{
    compute_mirror_at_rest_aad, compute_mirror_key, u64_be, Hash256, DOMAIN_VOTE_MIRROR_ATREST_AAD_V1,
    DOMAIN_VOTE_MIRROR_KEY_V1,
};
