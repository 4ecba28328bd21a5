//! PostgreSQL-backed implementations of the service seams.

pub mod dispute_index;
pub mod lease;
pub mod vote_mirror;

pub use dispute_index::PgDisputeIndex;
pub use lease::{InMemoryRunLease, PgRunLease, REVEAL_RUN_LOCK_KEY};
pub use vote_mirror::PgVoteMirror;
