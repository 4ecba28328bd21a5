//! Shared identifier, time, and outcome types.

use std::fmt;

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::crypto::hash::{compute_mirror_key, Hash256};

/// Seconds since the Unix epoch.
///
/// Phase arithmetic never reads the ambient clock; callers capture `now` once
/// and pass it down, so every predicate is deterministic under test.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Capture the current wall clock.
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp())
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    pub fn plus_secs(&self, secs: i64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    pub fn minus_secs(&self, secs: i64) -> Self {
        Self(self.0.saturating_sub(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(secs: i64) -> Self {
        Self(secs)
    }
}

/// Adjudicated outcome of a dispute.
///
/// `ruling` on a [`crate::domain::Dispute`] is meaningful only once the
/// dispute is executed; before that it is zero and must not be read as a tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Party {
    /// No outcome / tie.
    None = 0,
    /// The original request is upheld.
    Requester = 1,
    /// The challenge is upheld; the request is rejected.
    Challenger = 2,
}

impl Party {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Party::None),
            1 => Some(Party::Requester),
            2 => Some(Party::Challenger),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Party::None => "none",
            Party::Requester => "requester",
            Party::Challenger => "challenger",
        };
        write!(f, "{name}")
    }
}

/// Vote mirror slot key.
///
/// Derived deterministically from the vote's identity; two machines deriving
/// a key for the same committed vote always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MirrorKey(pub Hash256);

impl MirrorKey {
    pub fn derive(
        arbitrator: &Address,
        dispute_id: u64,
        voter: &Address,
        commit_hash: &B256,
    ) -> Self {
        Self(compute_mirror_key(arbitrator, dispute_id, voter, commit_hash))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for MirrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
