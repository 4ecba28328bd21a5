//! Dispute and vote snapshot models.

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{Party, Timestamp};

/// A challenge raised against a grant, adjudicated by an on-chain arbitrator.
///
/// The three timestamps are monotone: `voting_start_time <= voting_end_time
/// <= reveal_period_end_time`. There is no stored phase field; phase is
/// always derived from these timestamps and `is_executed` (see
/// [`crate::domain::phase`]). `ruling` is meaningful only once `is_executed`
/// is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub arbitrator: Address,
    pub dispute_id: u64,
    pub chain_id: u64,
    pub grant_id: Uuid,
    pub voting_start_time: Timestamp,
    pub voting_end_time: Timestamp,
    pub reveal_period_end_time: Timestamp,
    pub is_executed: bool,
    pub ruling: Party,
}

impl Dispute {
    pub fn new(
        arbitrator: Address,
        dispute_id: u64,
        chain_id: u64,
        grant_id: Uuid,
        voting_start_time: Timestamp,
        voting_end_time: Timestamp,
        reveal_period_end_time: Timestamp,
    ) -> Self {
        Self {
            arbitrator,
            dispute_id,
            chain_id,
            grant_id,
            voting_start_time,
            voting_end_time,
            reveal_period_end_time,
            is_executed: false,
            ruling: Party::None,
        }
    }

    pub fn with_executed(mut self, ruling: Party) -> Self {
        self.is_executed = true;
        self.ruling = ruling;
        self
    }
}

/// A committed vote as mirrored from chain events.
///
/// `choice` is `None` until a reveal transaction is observed by the external
/// indexer; the reveal worker's job is to cause that observation, never to
/// write `choice` itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeVote {
    pub arbitrator: Address,
    pub dispute_id: u64,
    pub voter: Address,
    pub commit_hash: B256,
    pub choice: Option<Party>,
    pub reason: Option<String>,
    pub salt: Option<B256>,
}

impl DisputeVote {
    pub fn committed(
        arbitrator: Address,
        dispute_id: u64,
        voter: Address,
        commit_hash: B256,
    ) -> Self {
        Self {
            arbitrator,
            dispute_id,
            voter,
            commit_hash,
            choice: None,
            reason: None,
            salt: None,
        }
    }

    pub fn is_revealed(&self) -> bool {
        self.choice.is_some()
    }
}

/// Plaintext vote payload held by the mirror until revealed.
///
/// Written once at commit time by the external indexer; read-only for the
/// worker; retained for audit and replay after the reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedVote {
    pub voter: Address,
    pub choice: Party,
    #[serde(default)]
    pub reason: String,
    pub salt: B256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_vote_roundtrips_through_json() {
        let vote = SavedVote {
            voter: Address::repeat_byte(0x11),
            choice: Party::Requester,
            reason: "supports the listing".to_string(),
            salt: B256::repeat_byte(0x5A),
        };

        let json = serde_json::to_string(&vote).unwrap();
        let back: SavedVote = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vote);
    }

    #[test]
    fn saved_vote_reason_defaults_to_empty() {
        let json = r#"{
            "voter": "0x1111111111111111111111111111111111111111",
            "choice": 2,
            "salt": "0x5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a"
        }"#;

        let vote: SavedVote = serde_json::from_str(json).unwrap();
        assert_eq!(vote.choice, Party::Challenger);
        assert!(vote.reason.is_empty());
    }

    #[test]
    fn vote_reveal_state_tracks_choice() {
        let mut vote = DisputeVote::committed(
            Address::repeat_byte(0xA1),
            5,
            Address::repeat_byte(0xB2),
            B256::repeat_byte(0xC3),
        );
        assert!(!vote.is_revealed());

        vote.choice = Some(Party::Requester);
        assert!(vote.is_revealed());
    }
}
