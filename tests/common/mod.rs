//! Shared fixtures and in-memory service fakes for integration tests.
//!
//! The fakes implement the same seams the worker and the API use in
//! production, so tests drive real control flow without a database or an
//! RPC node. `ScriptedGateway` behaves like a ledger: a confirmation flips
//! the voter's receipt and advances the signing account's transaction
//! count, which is what makes repeated passes observably idempotent.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use uuid::Uuid;

use registry_revealer::domain::{
    Dispute, DisputeVote, Grant, GrantStatus, MirrorKey, Party, SavedVote, Timestamp,
};
use registry_revealer::infra::{
    ArbitratorGateway, DisputeIndex, InMemoryRunLease, Result, RevealRequest, RevealerError,
    VoteMirror, VoteReceipt,
};
use registry_revealer::metrics::MetricsRegistry;
use registry_revealer::worker::{RevealWorker, RevealWorkerConfig};

// ============================================================================
// Fixtures
// ============================================================================

/// Chain the test disputes live on.
pub const CHAIN_ID: u64 = 31337;

/// Fixed evaluation instant; tests pin `now` so windows are deterministic.
pub fn fixed_now() -> Timestamp {
    Timestamp(1_700_000_000)
}

pub fn arbitrator() -> Address {
    Address::repeat_byte(0xA1)
}

pub fn voter(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn test_grant_id() -> Uuid {
    Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap()
}

/// A registration request whose challenge period ends at `ends`.
pub fn pending_grant(ends: Timestamp) -> Grant {
    Grant {
        id: test_grant_id(),
        ..Grant::new(
            Address::repeat_byte(0x10),
            GrantStatus::RegistrationRequested,
            ends,
        )
    }
}

/// A dispute whose reveal window is open at `now` (voting ended 600s ago,
/// reveal period ends 600s from now).
pub fn reveal_window_dispute(dispute_id: u64, now: Timestamp) -> Dispute {
    Dispute::new(
        arbitrator(),
        dispute_id,
        CHAIN_ID,
        test_grant_id(),
        now.minus_secs(3_600),
        now.minus_secs(600),
        now.plus_secs(600),
    )
}

pub fn committed_vote(dispute_id: u64, voter_addr: Address, commit_byte: u8) -> DisputeVote {
    DisputeVote::committed(
        arbitrator(),
        dispute_id,
        voter_addr,
        B256::repeat_byte(commit_byte),
    )
}

pub fn saved_vote_for(vote: &DisputeVote, choice: Party, salt_byte: u8) -> SavedVote {
    SavedVote {
        voter: vote.voter,
        choice,
        reason: "mirrored at commit time".to_string(),
        salt: B256::repeat_byte(salt_byte),
    }
}

pub fn mirror_key_of(vote: &DisputeVote) -> MirrorKey {
    MirrorKey::derive(
        &vote.arbitrator,
        vote.dispute_id,
        &vote.voter,
        &vote.commit_hash,
    )
}

// ============================================================================
// Dispute index fake
// ============================================================================

/// In-memory dispute index with fixed contents.
///
/// The reveal-window filter mirrors the production query: chain-scoped,
/// not executed, and strictly between `voting_end_time` and
/// `reveal_period_end_time`.
#[derive(Default)]
pub struct StaticIndex {
    grants: HashMap<Uuid, Grant>,
    disputes: Vec<Dispute>,
    votes: HashMap<(Address, u64), Vec<DisputeVote>>,
}

impl StaticIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grant(mut self, grant: Grant) -> Self {
        self.grants.insert(grant.id, grant);
        self
    }

    pub fn with_dispute(mut self, dispute: Dispute) -> Self {
        self.disputes.push(dispute);
        self
    }

    pub fn with_vote(mut self, vote: DisputeVote) -> Self {
        self.votes
            .entry((vote.arbitrator, vote.dispute_id))
            .or_default()
            .push(vote);
        self
    }
}

#[async_trait]
impl DisputeIndex for StaticIndex {
    async fn disputes_in_reveal_window(
        &self,
        now: Timestamp,
        chain_id: u64,
    ) -> Result<Vec<Dispute>> {
        Ok(self
            .disputes
            .iter()
            .filter(|d| {
                d.chain_id == chain_id
                    && !d.is_executed
                    && d.voting_end_time < now
                    && d.reveal_period_end_time > now
            })
            .cloned()
            .collect())
    }

    async fn unrevealed_votes(
        &self,
        arbitrator: Address,
        dispute_id: u64,
    ) -> Result<Vec<DisputeVote>> {
        Ok(self
            .votes
            .get(&(arbitrator, dispute_id))
            .map(|votes| {
                votes
                    .iter()
                    .filter(|v| v.choice.is_none())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn grant(&self, id: Uuid) -> Result<Option<Grant>> {
        Ok(self.grants.get(&id).cloned())
    }

    async fn dispute(&self, arbitrator: Address, dispute_id: u64) -> Result<Option<Dispute>> {
        Ok(self
            .disputes
            .iter()
            .find(|d| d.arbitrator == arbitrator && d.dispute_id == dispute_id)
            .cloned())
    }

    async fn dispute_for_grant(&self, grant_id: Uuid) -> Result<Option<Dispute>> {
        Ok(self
            .disputes
            .iter()
            .rev()
            .find(|d| d.grant_id == grant_id)
            .cloned())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Vote mirror fake
// ============================================================================

/// In-memory vote mirror with fixed contents.
#[derive(Default)]
pub struct StaticMirror {
    entries: HashMap<MirrorKey, SavedVote>,
}

impl StaticMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: MirrorKey, vote: SavedVote) -> Self {
        self.entries.insert(key, vote);
        self
    }
}

#[async_trait]
impl VoteMirror for StaticMirror {
    async fn get(&self, key: &MirrorKey) -> Result<Option<SavedVote>> {
        Ok(self.entries.get(key).cloned())
    }
}

// ============================================================================
// Arbitrator gateway fake
// ============================================================================

#[derive(Default)]
struct LedgerState {
    revealed: HashMap<(Address, u64, Address), bool>,
    transaction_count: u64,
    submissions: Vec<(Address, RevealRequest, u64)>,
    pending: HashMap<B256, (Address, u64, Address)>,
    confirmations: Vec<B256>,
    broken_voters: Vec<Address>,
}

/// In-memory arbitrator ledger.
///
/// Receipts, the signer's transaction count, and confirmations evolve the
/// way a real chain would observe this worker: a submission stays pending
/// until confirmed, and only a confirmation flips the receipt and consumes
/// the nonce.
#[derive(Default)]
pub struct ScriptedGateway {
    state: Mutex<LedgerState>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a voter as already revealed on the ledger.
    pub fn with_revealed(self, arbitrator: Address, dispute_id: u64, voter: Address) -> Self {
        self.state
            .lock()
            .unwrap()
            .revealed
            .insert((arbitrator, dispute_id, voter), true);
        self
    }

    /// Make every submission for `voter` fail at the RPC layer.
    pub fn with_broken_voter(self, voter: Address) -> Self {
        self.state.lock().unwrap().broken_voters.push(voter);
        self
    }

    /// Successful submissions in order: (arbitrator, request, nonce).
    pub fn submissions(&self) -> Vec<(Address, RevealRequest, u64)> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn confirmations(&self) -> Vec<B256> {
        self.state.lock().unwrap().confirmations.clone()
    }
}

fn tx_hash_for(nonce: u64) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&nonce.to_be_bytes());
    B256::from(bytes)
}

#[async_trait]
impl ArbitratorGateway for ScriptedGateway {
    async fn read_receipt(
        &self,
        arbitrator: Address,
        dispute_id: u64,
        voter: Address,
    ) -> Result<VoteReceipt> {
        let state = self.state.lock().unwrap();
        let has_revealed = state
            .revealed
            .get(&(arbitrator, dispute_id, voter))
            .copied()
            .unwrap_or(false);
        Ok(VoteReceipt { has_revealed })
    }

    async fn transaction_count(&self) -> Result<u64> {
        Ok(self.state.lock().unwrap().transaction_count)
    }

    async fn submit_reveal(
        &self,
        arbitrator: Address,
        request: RevealRequest,
        nonce: u64,
    ) -> Result<B256> {
        let mut state = self.state.lock().unwrap();
        if state.broken_voters.contains(&request.voter) {
            return Err(RevealerError::Ledger(format!(
                "submission rejected for voter {}",
                request.voter
            )));
        }

        let tx_hash = tx_hash_for(nonce);
        state
            .pending
            .insert(tx_hash, (arbitrator, request.dispute_id, request.voter));
        state.submissions.push((arbitrator, request, nonce));
        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx_hash: B256) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(vote) = state.pending.remove(&tx_hash) {
            state.revealed.insert(vote, true);
            state.transaction_count += 1;
        }
        state.confirmations.push(tx_hash);
        Ok(())
    }
}

// ============================================================================
// Worker assembly
// ============================================================================

/// Build a worker over the given fakes with a fresh in-memory lease. The
/// scheduler is disabled so only explicit runs produce passes.
pub fn worker_with(
    index: Arc<dyn DisputeIndex>,
    mirror: Arc<dyn VoteMirror>,
    gateway: Arc<dyn ArbitratorGateway>,
) -> (RevealWorker, Arc<MetricsRegistry>) {
    let config = RevealWorkerConfig {
        run_interval: Duration::from_secs(3_600),
        enabled: false,
        chain_id: CHAIN_ID,
    };
    let metrics = Arc::new(MetricsRegistry::new());
    let worker = RevealWorker::new(
        config,
        index,
        mirror,
        gateway,
        Arc::new(InMemoryRunLease::new()),
        Arc::clone(&metrics),
    );
    (worker, metrics)
}
