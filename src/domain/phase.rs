//! Dispute state machine: eligibility predicates over snapshots.
//!
//! Every function here is a closed-form boolean over immutable snapshot
//! fields and a caller-supplied `now`. Phase membership is always derived
//! from the timestamps plus `is_executed`/`ruling`; nothing is cached, so a
//! stored status can never drift from the time-derived truth. The same
//! predicates drive both the worker's selection and client-facing
//! eligibility checks.
//!
//! Boundary semantics follow the registry contract: windows are inclusive at
//! both ends, so the instants `voting_end_time` and `reveal_period_end_time`
//! each belong to two adjacent windows. [`dispute_phase`] resolves those
//! instants to the earlier phase.

use serde::{Deserialize, Serialize};

use super::dispute::Dispute;
use super::grant::Grant;
use super::types::{Party, Timestamp};

/// A pending, undisputed request can be challenged while its challenge
/// period is still open.
pub fn can_be_challenged(grant: &Grant, now: Timestamp) -> bool {
    grant.status.is_pending() && !grant.is_disputed && grant.challenge_period_ends_at > now
}

/// A pending, undisputed request auto-executes once its challenge period has
/// elapsed. Exact complement boundary of [`can_be_challenged`]: at the
/// boundary instant execution becomes legal and challenging no longer is.
pub fn can_request_be_executed(grant: &Grant, now: Timestamp) -> bool {
    grant.status.is_pending() && !grant.is_disputed && grant.challenge_period_ends_at <= now
}

/// Voting has not opened yet.
pub fn is_dispute_waiting_for_voting(dispute: &Dispute, now: Timestamp) -> bool {
    !dispute.is_executed && dispute.voting_start_time > now
}

/// Commits are being accepted.
pub fn can_dispute_be_voted_on(dispute: &Dispute, now: Timestamp) -> bool {
    !dispute.is_executed
        && dispute.voting_start_time <= now
        && now <= dispute.voting_end_time
}

/// Voting has closed, regardless of execution state.
pub fn is_dispute_voting_over(dispute: &Dispute, now: Timestamp) -> bool {
    dispute.voting_end_time < now
}

/// The window in which reveals are accepted on chain; the worker operates
/// here.
pub fn is_dispute_revealing_votes(dispute: &Dispute, now: Timestamp) -> bool {
    dispute.voting_end_time <= now && now <= dispute.reveal_period_end_time
}

/// The reveal window has elapsed and the ruling can be executed.
pub fn can_dispute_be_executed(dispute: &Dispute, now: Timestamp) -> bool {
    !dispute.is_executed && dispute.reveal_period_end_time <= now
}

/// Executed with no winning party (a tie).
pub fn is_dispute_resolved_for_none_party(dispute: &Dispute) -> bool {
    dispute.is_executed && dispute.ruling == Party::None
}

/// The challenge was upheld and the underlying request is rejected.
pub fn is_request_rejected(grant: &Grant, dispute: &Dispute) -> bool {
    dispute.is_executed
        && dispute.ruling == Party::Challenger
        && !grant.is_disputed
        && grant.is_resolved
}

/// Derived lifecycle phase of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputePhase {
    WaitingForVoting,
    Voting,
    Revealing,
    AwaitingExecution,
    Executed,
}

impl DisputePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputePhase::WaitingForVoting => "waiting_for_voting",
            DisputePhase::Voting => "voting",
            DisputePhase::Revealing => "revealing",
            DisputePhase::AwaitingExecution => "awaiting_execution",
            DisputePhase::Executed => "executed",
        }
    }
}

impl std::fmt::Display for DisputePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a dispute into exactly one phase.
///
/// Windows are checked earliest-first, so the shared boundary instants
/// resolve to the earlier phase.
pub fn dispute_phase(dispute: &Dispute, now: Timestamp) -> DisputePhase {
    if dispute.is_executed {
        DisputePhase::Executed
    } else if is_dispute_waiting_for_voting(dispute, now) {
        DisputePhase::WaitingForVoting
    } else if can_dispute_be_voted_on(dispute, now) {
        DisputePhase::Voting
    } else if is_dispute_revealing_votes(dispute, now) {
        DisputePhase::Revealing
    } else {
        DisputePhase::AwaitingExecution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grant::GrantStatus;
    use alloy::primitives::Address;

    const NOW: Timestamp = Timestamp(1_700_000_000);

    fn pending_grant(challenge_ends: Timestamp) -> Grant {
        Grant::new(
            Address::repeat_byte(0x10),
            GrantStatus::RegistrationRequested,
            challenge_ends,
        )
    }

    fn dispute(start: i64, voting_end: i64, reveal_end: i64) -> Dispute {
        Dispute::new(
            Address::repeat_byte(0xA1),
            1,
            1,
            uuid::Uuid::new_v4(),
            Timestamp(start),
            Timestamp(voting_end),
            Timestamp(reveal_end),
        )
    }

    #[test]
    fn open_challenge_period_allows_challenge_not_execution() {
        let grant = pending_grant(NOW.plus_secs(3600));

        assert!(can_be_challenged(&grant, NOW));
        assert!(!can_request_be_executed(&grant, NOW));
    }

    #[test]
    fn elapsed_challenge_period_allows_execution_not_challenge() {
        let grant = pending_grant(NOW.minus_secs(1));

        assert!(can_request_be_executed(&grant, NOW));
        assert!(!can_be_challenged(&grant, NOW));
    }

    #[test]
    fn challenge_boundary_instant_flips_to_execution() {
        let grant = pending_grant(NOW);

        assert!(!can_be_challenged(&grant, NOW));
        assert!(can_request_be_executed(&grant, NOW));
    }

    #[test]
    fn disputed_or_settled_grants_allow_neither() {
        let disputed = pending_grant(NOW.plus_secs(3600)).with_disputed(true);
        assert!(!can_be_challenged(&disputed, NOW));
        assert!(!can_request_be_executed(&disputed, NOW));

        let mut registered = pending_grant(NOW.plus_secs(3600));
        registered.status = GrantStatus::Registered;
        assert!(!can_be_challenged(&registered, NOW));
        assert!(!can_request_be_executed(&registered, NOW));
    }

    #[test]
    fn dispute_before_voting_opens() {
        let d = dispute(NOW.0 + 100, NOW.0 + 200, NOW.0 + 300);

        assert!(is_dispute_waiting_for_voting(&d, NOW));
        assert!(!can_dispute_be_voted_on(&d, NOW));
        assert!(!is_dispute_revealing_votes(&d, NOW));
        assert_eq!(dispute_phase(&d, NOW), DisputePhase::WaitingForVoting);
    }

    #[test]
    fn dispute_in_voting_window() {
        let d = dispute(NOW.0 - 100, NOW.0 + 100, NOW.0 + 200);

        assert!(can_dispute_be_voted_on(&d, NOW));
        assert!(!is_dispute_voting_over(&d, NOW));
        assert_eq!(dispute_phase(&d, NOW), DisputePhase::Voting);
    }

    #[test]
    fn dispute_in_reveal_window() {
        let d = dispute(NOW.0 - 200, NOW.0 - 10, NOW.0 + 100);

        assert!(is_dispute_voting_over(&d, NOW));
        assert!(is_dispute_revealing_votes(&d, NOW));
        assert!(!can_dispute_be_voted_on(&d, NOW));
        assert!(!can_dispute_be_executed(&d, NOW));
        assert_eq!(dispute_phase(&d, NOW), DisputePhase::Revealing);
    }

    #[test]
    fn dispute_past_reveal_window() {
        let d = dispute(NOW.0 - 300, NOW.0 - 200, NOW.0 - 100);

        assert!(can_dispute_be_executed(&d, NOW));
        assert!(!is_dispute_revealing_votes(&d, NOW));
        assert_eq!(dispute_phase(&d, NOW), DisputePhase::AwaitingExecution);
    }

    #[test]
    fn voting_end_instant_belongs_to_both_windows_classifier_picks_voting() {
        let d = dispute(NOW.0 - 100, NOW.0, NOW.0 + 100);

        assert!(can_dispute_be_voted_on(&d, NOW));
        assert!(is_dispute_revealing_votes(&d, NOW));
        assert!(!is_dispute_voting_over(&d, NOW));
        assert_eq!(dispute_phase(&d, NOW), DisputePhase::Voting);
    }

    #[test]
    fn reveal_end_instant_is_both_revealing_and_executable() {
        let d = dispute(NOW.0 - 200, NOW.0 - 100, NOW.0);

        assert!(is_dispute_revealing_votes(&d, NOW));
        assert!(can_dispute_be_executed(&d, NOW));
        assert_eq!(dispute_phase(&d, NOW), DisputePhase::Revealing);
    }

    #[test]
    fn executed_dispute_is_terminal() {
        let d = dispute(NOW.0 - 300, NOW.0 - 200, NOW.0 - 100).with_executed(Party::Requester);

        assert!(!can_dispute_be_voted_on(&d, NOW));
        assert!(!can_dispute_be_executed(&d, NOW));
        assert!(!is_dispute_waiting_for_voting(&d, NOW));
        assert_eq!(dispute_phase(&d, NOW), DisputePhase::Executed);
    }

    #[test]
    fn challenger_ruling_on_resolved_grant_rejects_request() {
        let grant = pending_grant(NOW.minus_secs(5000)).with_resolved(true);
        let d = dispute(NOW.0 - 300, NOW.0 - 200, NOW.0 - 100).with_executed(Party::Challenger);

        assert!(is_request_rejected(&grant, &d));

        let tie = dispute(NOW.0 - 300, NOW.0 - 200, NOW.0 - 100).with_executed(Party::None);
        assert!(!is_request_rejected(&grant, &tie));
        assert!(is_dispute_resolved_for_none_party(&tie));
    }

    #[test]
    fn rejection_requires_settled_undisputed_grant() {
        let d = dispute(NOW.0 - 300, NOW.0 - 200, NOW.0 - 100).with_executed(Party::Challenger);

        let still_disputed = pending_grant(NOW.minus_secs(5000))
            .with_resolved(true)
            .with_disputed(true);
        assert!(!is_request_rejected(&still_disputed, &d));

        let unresolved = pending_grant(NOW.minus_secs(5000));
        assert!(!is_request_rejected(&unresolved, &d));
    }

    #[test]
    fn ruling_is_not_interpreted_before_execution() {
        let d = dispute(NOW.0 - 300, NOW.0 - 200, NOW.0 - 100);

        assert_eq!(d.ruling, Party::None);
        assert!(!is_dispute_resolved_for_none_party(&d));
    }
}
