//! Reveal worker
//!
//! Background service that reveals committed votes on behalf of their
//! voters once a dispute enters its reveal window. Each pass:
//!
//! 1. Takes the run lease; if another run holds it the pass is a no-op
//! 2. Selects disputes currently inside their reveal window
//! 3. For each unrevealed vote, recovers the plaintext from the vote mirror
//! 4. Skips voters the ledger already shows as revealed
//! 5. Submits one reveal per remaining vote with an explicit nonce, waiting
//!    for confirmation before touching the next vote
//!
//! # Configuration
//!
//! - `REVEAL_INTERVAL_SECS` - How often to run a scheduled pass (default: 60)
//! - `REVEAL_SCHEDULER_ENABLED` - Run scheduled passes (default: true; manual
//!   triggers work either way)
//! - `CHAIN_ID` - Chain whose disputes this worker reveals on (default: 1)

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::domain::{Dispute, DisputeVote, MirrorKey, Timestamp};
use crate::infra::traits::{ArbitratorGateway, DisputeIndex, RevealRequest, RunLease, VoteMirror};
use crate::infra::{Result, RevealerError};
use crate::metrics::{metric_names, timed, MetricsRegistry};

/// Configuration for the reveal worker
#[derive(Debug, Clone)]
pub struct RevealWorkerConfig {
    /// How often to run a scheduled reveal pass
    pub run_interval: Duration,
    /// Whether scheduled passes run; manual triggers work either way
    pub enabled: bool,
    /// Chain whose disputes this worker reveals on
    pub chain_id: u64,
}

impl Default for RevealWorkerConfig {
    fn default() -> Self {
        Self {
            run_interval: Duration::from_secs(60),
            enabled: true,
            chain_id: 1,
        }
    }
}

impl RevealWorkerConfig {
    /// Load configuration from environment
    pub fn from_env() -> Self {
        let run_interval = std::env::var("REVEAL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(60));

        let enabled = std::env::var("REVEAL_SCHEDULER_ENABLED")
            .ok()
            .map(|s| s == "true" || s == "1")
            .unwrap_or(true);

        let chain_id = std::env::var("CHAIN_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        Self {
            run_interval,
            enabled,
            chain_id,
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }
}

/// Message types for reveal worker control
#[derive(Debug)]
pub enum RevealWorkerMessage {
    /// Run one reveal pass now and report its summary
    RunNow {
        respond_to: oneshot::Sender<Result<RunSummary>>,
    },
    /// Shutdown the worker
    Shutdown,
}

/// Outcome of one reveal pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// False when another run held the lease and this pass did nothing
    pub lease_acquired: bool,
    pub disputes_selected: usize,
    /// Disputes whose vote listing failed outright
    pub disputes_failed: usize,
    pub votes_considered: usize,
    pub votes_revealed: usize,
    /// Votes the ledger already showed as revealed
    pub votes_skipped: usize,
    pub votes_failed: usize,
}

impl RunSummary {
    /// True when nothing went wrong; a lease-contended no-op also counts.
    pub fn succeeded(&self) -> bool {
        self.disputes_failed == 0 && self.votes_failed == 0
    }
}

/// How a single vote was handled.
enum RevealOutcome {
    Revealed,
    AlreadyRevealed,
}

/// Reveal worker
///
/// Runs as a background task, driven by a ticker and a control channel. All
/// submissions go through one gateway bound to one signing account, and one
/// pass holds the run lease for its whole duration, so the account's nonce
/// sequence is never raced.
pub struct RevealWorker {
    config: RevealWorkerConfig,
    index: Arc<dyn DisputeIndex>,
    mirror: Arc<dyn VoteMirror>,
    gateway: Arc<dyn ArbitratorGateway>,
    lease: Arc<dyn RunLease>,
    metrics: Arc<MetricsRegistry>,
    control_tx: mpsc::Sender<RevealWorkerMessage>,
    control_rx: mpsc::Receiver<RevealWorkerMessage>,
}

impl RevealWorker {
    /// Create a new reveal worker
    pub fn new(
        config: RevealWorkerConfig,
        index: Arc<dyn DisputeIndex>,
        mirror: Arc<dyn VoteMirror>,
        gateway: Arc<dyn ArbitratorGateway>,
        lease: Arc<dyn RunLease>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let (control_tx, control_rx) = mpsc::channel(16);
        Self {
            config,
            index,
            mirror,
            gateway,
            lease,
            metrics,
            control_tx,
            control_rx,
        }
    }

    /// Get a sender handle for controlling the worker
    pub fn control_handle(&self) -> mpsc::Sender<RevealWorkerMessage> {
        self.control_tx.clone()
    }

    /// Run the reveal worker
    pub async fn run(mut self) {
        info!(
            interval_secs = self.config.run_interval.as_secs(),
            enabled = self.config.enabled,
            chain_id = self.config.chain_id,
            "Starting reveal worker"
        );

        let mut ticker = interval(self.config.run_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.config.enabled {
                        continue;
                    }
                    if let Err(e) = self.run_once().await {
                        error!(error = %e, "Scheduled reveal pass failed");
                    }
                }
                Some(msg) = self.control_rx.recv() => {
                    match msg {
                        RevealWorkerMessage::RunNow { respond_to } => {
                            let result = self.run_once().await;
                            if let Err(e) = &result {
                                error!(error = %e, "Triggered reveal pass failed");
                            }
                            let _ = respond_to.send(result);
                        }
                        RevealWorkerMessage::Shutdown => {
                            info!("Reveal worker shutting down");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Run one reveal pass against the current wall clock.
    pub async fn run_once(&self) -> Result<RunSummary> {
        self.run_at(Timestamp::now()).await
    }

    /// Run one reveal pass, evaluating every window at `now`.
    pub async fn run_at(&self, now: Timestamp) -> Result<RunSummary> {
        let Some(guard) = self.lease.try_acquire().await? else {
            info!("Run lease is held elsewhere, skipping reveal pass");
            self.metrics
                .inc_counter(metric_names::RUNS_LEASE_CONTENDED)
                .await;
            return Ok(RunSummary::default());
        };

        let outcome = timed(
            &self.metrics,
            metric_names::RUN_LATENCY,
            self.reveal_pass(now),
        )
        .await;
        guard.release().await;

        if let Ok(summary) = &outcome {
            self.metrics
                .inc_counter(metric_names::RUNS_COMPLETED)
                .await;
            self.metrics
                .set_gauge(metric_names::LAST_RUN_UNIX, now.as_secs().max(0) as u64)
                .await;
            info!(
                disputes = summary.disputes_selected,
                revealed = summary.votes_revealed,
                skipped = summary.votes_skipped,
                failed = summary.votes_failed,
                "Reveal pass finished"
            );
        }

        outcome
    }

    async fn reveal_pass(&self, now: Timestamp) -> Result<RunSummary> {
        let disputes = self
            .index
            .disputes_in_reveal_window(now, self.config.chain_id)
            .await?;

        let mut summary = RunSummary {
            lease_acquired: true,
            disputes_selected: disputes.len(),
            ..RunSummary::default()
        };

        if disputes.is_empty() {
            debug!("No disputes in their reveal window");
            return Ok(summary);
        }

        self.metrics
            .add_counter(metric_names::DISPUTES_SELECTED, disputes.len() as u64)
            .await;

        for dispute in &disputes {
            // A failure listing one dispute's votes skips only that dispute.
            if let Err(e) = self.reveal_dispute(dispute, &mut summary).await {
                summary.disputes_failed += 1;
                error!(
                    arbitrator = %dispute.arbitrator,
                    dispute_id = dispute.dispute_id,
                    error = %e,
                    "Failed to process dispute"
                );
            }
        }

        Ok(summary)
    }

    async fn reveal_dispute(&self, dispute: &Dispute, summary: &mut RunSummary) -> Result<()> {
        let votes = self
            .index
            .unrevealed_votes(dispute.arbitrator, dispute.dispute_id)
            .await?;

        for vote in &votes {
            summary.votes_considered += 1;

            match self.reveal_vote(dispute, vote).await {
                Ok(RevealOutcome::Revealed) => {
                    summary.votes_revealed += 1;
                    self.metrics.inc_counter(metric_names::VOTES_REVEALED).await;
                }
                Ok(RevealOutcome::AlreadyRevealed) => {
                    summary.votes_skipped += 1;
                    self.metrics.inc_counter(metric_names::VOTES_SKIPPED).await;
                    debug!(
                        dispute_id = dispute.dispute_id,
                        voter = %vote.voter,
                        "Vote already revealed on the ledger, skipping"
                    );
                }
                Err(e) => {
                    summary.votes_failed += 1;
                    self.metrics.inc_counter(metric_names::VOTES_FAILED).await;
                    error!(
                        dispute_id = dispute.dispute_id,
                        voter = %vote.voter,
                        error = %e,
                        "Failed to reveal vote, continuing with the next one"
                    );
                }
            }
        }

        Ok(())
    }

    /// Reveal a single vote end to end.
    ///
    /// The sequencing is load-bearing: this function returns only after the
    /// submitted transaction confirms, and the caller processes votes one at
    /// a time, so the next vote's nonce is always fetched after the previous
    /// transaction landed.
    async fn reveal_vote(&self, dispute: &Dispute, vote: &DisputeVote) -> Result<RevealOutcome> {
        let key = MirrorKey::derive(
            &vote.arbitrator,
            vote.dispute_id,
            &vote.voter,
            &vote.commit_hash,
        );

        let saved = self.mirror.get(&key).await?.ok_or_else(|| {
            RevealerError::MissingMirrorEntry {
                dispute_id: vote.dispute_id,
                voter: vote.voter,
                commit_hash: vote.commit_hash,
            }
        })?;

        if saved.voter != vote.voter {
            return Err(RevealerError::MalformedSavedVote(format!(
                "mirror entry voter {} does not match vote voter {}",
                saved.voter, vote.voter
            )));
        }

        let receipt = self
            .gateway
            .read_receipt(dispute.arbitrator, dispute.dispute_id, vote.voter)
            .await?;
        if receipt.has_revealed {
            return Ok(RevealOutcome::AlreadyRevealed);
        }

        let nonce = self.gateway.transaction_count().await?;
        let request = RevealRequest {
            dispute_id: dispute.dispute_id,
            voter: vote.voter,
            choice: saved.choice,
            reason: saved.reason,
            salt: saved.salt,
        };

        let tx_hash = self
            .gateway
            .submit_reveal(dispute.arbitrator, request, nonce)
            .await?;

        self.gateway.await_confirmation(tx_hash).await?;

        info!(
            dispute_id = dispute.dispute_id,
            voter = %vote.voter,
            tx = %tx_hash,
            nonce,
            "Vote revealed"
        );

        Ok(RevealOutcome::Revealed)
    }
}

/// Spawn the reveal worker as a background task
pub fn spawn_reveal_worker(
    worker: RevealWorker,
) -> (
    tokio::task::JoinHandle<()>,
    mpsc::Sender<RevealWorkerMessage>,
) {
    let control_handle = worker.control_handle();
    let handle = tokio::spawn(worker.run());
    (handle, control_handle)
}
