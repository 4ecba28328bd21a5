//! Registry Revealer Library
//!
//! Dispute-lifecycle core for a token-curated funding registry: pure
//! time-based phase predicates over grant/dispute snapshots, an encrypted
//! vote mirror, and a scheduled worker that reveals committed votes during
//! each dispute's reveal window.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (grants, disputes, votes) and phase predicates
//! - [`crypto`] - Mirror key derivation and the at-rest encryption envelope
//! - [`infra`] - Infrastructure implementations (PostgreSQL index, mirror, run lease)
//! - [`ledger`] - Alloy gateway to the on-chain arbitrator contracts
//! - [`worker`] - The scheduled reveal worker
//! - [`auth`] - Bearer-token authentication for the HTTP API
//! - [`metrics`] - Observability and metrics
//! - [`telemetry`] - Logging setup
//! - [`api`] - REST API routes

pub mod api;
pub mod auth;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod ledger;
pub mod metrics;
pub mod migrations;
pub mod server;
pub mod telemetry;
pub mod worker;

// Re-export commonly used types
pub use domain::{
    Dispute, DisputePhase, DisputeVote, Grant, GrantStatus, MirrorKey, Party, SavedVote, Timestamp,
};

pub use infra::{
    ArbitratorGateway, DisputeIndex, Result, RevealRequest, RevealerError, RunLease, VoteMirror,
    VoteReceipt,
};

pub use worker::{RevealWorker, RevealWorkerConfig, RunSummary};
