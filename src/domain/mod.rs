//! Core domain types and the dispute state machine.

pub mod dispute;
pub mod grant;
pub mod phase;
pub mod types;

pub use dispute::{Dispute, DisputeVote, SavedVote};
pub use grant::{Grant, GrantStatus};
pub use phase::{
    can_be_challenged, can_dispute_be_executed, can_dispute_be_voted_on, can_request_be_executed,
    dispute_phase, is_dispute_resolved_for_none_party, is_dispute_revealing_votes,
    is_dispute_voting_over, is_dispute_waiting_for_voting, is_request_rejected, DisputePhase,
};
pub use types::{MirrorKey, Party, Timestamp};
