//! Deterministic hashing for the vote mirror.
//!
//! Every hash is SHA-256 over a domain-prefixed binary encoding, so values
//! computed for one purpose can never collide with another. Mirror keys are
//! a pure function of `(arbitrator, disputeId, voter, commitHash)`: the same
//! committed vote always addresses the same mirror slot, on any machine, with
//! no stored mapping.

use alloy::primitives::{Address, B256};
use sha2::{Digest, Sha256};

/// 32-byte hash output.
pub type Hash256 = [u8; 32];

/// Domain prefix for vote mirror slot keys.
pub const DOMAIN_VOTE_MIRROR_KEY_V1: &[u8] = b"REGISTRY_VOTE_MIRROR_KEY_V1";

/// Domain prefix for the mirror at-rest AAD.
pub const DOMAIN_VOTE_MIRROR_ATREST_AAD_V1: &[u8] = b"REGISTRY_VOTE_MIRROR_ATREST_AAD_V1";

/// Encode a u64 as big-endian bytes.
pub fn u64_be(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Compute the mirror slot key for a committed vote.
pub fn compute_mirror_key(
    arbitrator: &Address,
    dispute_id: u64,
    voter: &Address,
    commit_hash: &B256,
) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_VOTE_MIRROR_KEY_V1);
    hasher.update(arbitrator.as_slice());
    hasher.update(u64_be(dispute_id));
    hasher.update(voter.as_slice());
    hasher.update(commit_hash.as_slice());
    hasher.finalize().into()
}

/// Compute the at-rest AAD for a mirror entry.
///
/// The AAD binds a ciphertext to its slot key, so an encrypted payload moved
/// to a different slot fails authentication instead of decrypting as someone
/// else's vote.
pub fn compute_mirror_at_rest_aad(mirror_key: &Hash256) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_VOTE_MIRROR_ATREST_AAD_V1);
    hasher.update(mirror_key);
    hasher.finalize().into()
}
