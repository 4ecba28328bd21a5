//! Infrastructure: persistence, ledger seams, retry, and error types.

pub mod error;
pub mod postgres;
pub mod retry;
pub mod traits;

pub use error::{Result, RevealerError};
pub use postgres::{InMemoryRunLease, PgDisputeIndex, PgRunLease, PgVoteMirror};
pub use retry::{Retry, RetryConfig, RetryResult};
pub use traits::{
    ArbitratorGateway, DisputeIndex, LeaseGuard, RevealRequest, RunLease, VoteMirror, VoteReceipt,
};
