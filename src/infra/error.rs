//! Error types for the revealer.

use alloy::primitives::{Address, B256};
use thiserror::Error;
use uuid::Uuid;

use crate::crypto::EncryptionError;

#[derive(Error, Debug)]
pub enum RevealerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("grant not found: {0}")]
    GrantNotFound(Uuid),

    #[error("dispute not found: {arbitrator}/{dispute_id}")]
    DisputeNotFound {
        arbitrator: Address,
        dispute_id: u64,
    },

    /// A committed, unrevealed vote has no mirror entry. The selection query
    /// only considers votes already observed on chain, so this is a broken
    /// precondition for that vote, never a "not yet committed" state.
    #[error("no mirror entry for dispute {dispute_id}, voter {voter}, commit {commit_hash}")]
    MissingMirrorEntry {
        dispute_id: u64,
        voter: Address,
        commit_hash: B256,
    },

    #[error("malformed saved vote: {0}")]
    MalformedSavedVote(String),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("transaction reverted: {tx_hash}")]
    TxReverted { tx_hash: B256 },

    #[error("confirmation timed out for transaction {tx_hash}")]
    ConfirmationTimeout { tx_hash: B256 },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<EncryptionError> for RevealerError {
    fn from(err: EncryptionError) -> Self {
        RevealerError::Encryption(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RevealerError>;
