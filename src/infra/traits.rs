//! Service trait seams.
//!
//! Every external collaborator of the reveal worker sits behind a trait, so
//! the worker can be exercised with mocks and swapped implementations.

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

use crate::domain::{Dispute, DisputeVote, Grant, MirrorKey, Party, SavedVote, Timestamp};
use crate::infra::error::Result;

/// Point-in-time receipt state for one voter on one dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteReceipt {
    pub has_revealed: bool,
}

/// A reveal ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealRequest {
    pub dispute_id: u64,
    pub voter: Address,
    pub choice: Party,
    pub reason: String,
    pub salt: B256,
}

/// Read/write access to the arbitrator contracts on the ledger.
///
/// An implementation is bound to exactly one signing account; the nonce
/// sequence of that account is the shared resource the worker serializes on.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ArbitratorGateway: Send + Sync {
    /// Read the voter's receipt. `has_revealed` is the idempotency anchor:
    /// it reflects ledger truth, not local bookkeeping.
    async fn read_receipt(
        &self,
        arbitrator: Address,
        dispute_id: u64,
        voter: Address,
    ) -> Result<VoteReceipt>;

    /// Current transaction count of the bound signing account, used as the
    /// next nonce.
    async fn transaction_count(&self) -> Result<u64>;

    /// Submit a reveal with an explicit nonce and return the transaction
    /// hash. Never retried internally: a resubmission could consume a second
    /// nonce for the same vote.
    async fn submit_reveal(
        &self,
        arbitrator: Address,
        request: RevealRequest,
        nonce: u64,
    ) -> Result<B256>;

    /// Block until the transaction is confirmed; errors on revert or
    /// timeout.
    async fn await_confirmation(&self, tx_hash: B256) -> Result<()>;
}

/// Encrypted vote mirror.
///
/// Entries are written once at commit time by the external indexer and
/// retained for at least the dispute's reveal window. The core only reads:
/// `None` for a committed vote is a broken precondition, not a pending
/// state.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VoteMirror: Send + Sync {
    async fn get(&self, key: &MirrorKey) -> Result<Option<SavedVote>>;
}

/// Query surface over the mirrored registry state.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DisputeIndex: Send + Sync {
    /// Disputes currently in their reveal window on `chain_id`:
    /// `!is_executed AND voting_end_time < now AND reveal_period_end_time > now`.
    async fn disputes_in_reveal_window(
        &self,
        now: Timestamp,
        chain_id: u64,
    ) -> Result<Vec<Dispute>>;

    /// Committed votes not yet marked revealed (`choice IS NULL`).
    async fn unrevealed_votes(
        &self,
        arbitrator: Address,
        dispute_id: u64,
    ) -> Result<Vec<DisputeVote>>;

    async fn grant(&self, id: Uuid) -> Result<Option<Grant>>;

    async fn dispute(&self, arbitrator: Address, dispute_id: u64) -> Result<Option<Dispute>>;

    /// Most recent dispute raised against a grant, if any.
    async fn dispute_for_grant(&self, grant_id: Uuid) -> Result<Option<Dispute>>;

    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> Result<()>;
}

/// Run-level mutual exclusion for the reveal worker.
///
/// At most one reveal pass may be active system-wide: every pass submits
/// from the same signing account, and two interleaved passes would race for
/// nonces.
#[async_trait]
pub trait RunLease: Send + Sync {
    /// Take the lease, or `None` when another run holds it.
    async fn try_acquire(&self) -> Result<Option<Box<dyn LeaseGuard>>>;
}

/// A held run lease. Released explicitly at the end of a pass; dropping the
/// guard also releases it so a panicking run cannot wedge the worker.
#[async_trait]
pub trait LeaseGuard: Send {
    async fn release(self: Box<Self>);
}
