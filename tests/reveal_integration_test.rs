//! End-to-end reveal worker tests over in-memory services.
//!
//! These drive complete passes (lease, window selection, mirror recovery,
//! receipt check, nonce assignment, confirmation) against a ledger-like
//! gateway, so cross-run idempotency and nonce accounting are observed
//! rather than scripted.

mod common;

use std::sync::Arc;

use registry_revealer::domain::{Dispute, Party, Timestamp};
use registry_revealer::metrics::metric_names;

use common::*;

#[tokio::test]
async fn reveal_pass_reveals_every_committed_vote_in_nonce_order() {
    let now = fixed_now();
    let dispute = reveal_window_dispute(7, now);
    let votes = [
        committed_vote(7, voter(0x21), 0xC1),
        committed_vote(7, voter(0x22), 0xC2),
        committed_vote(7, voter(0x23), 0xC3),
    ];

    let mut index = StaticIndex::new().with_dispute(dispute);
    let mut mirror = StaticMirror::new();
    for (i, vote) in votes.iter().enumerate() {
        index = index.with_vote(vote.clone());
        mirror = mirror.with_entry(
            mirror_key_of(vote),
            saved_vote_for(vote, Party::Requester, 0x51 + i as u8),
        );
    }

    let gateway = Arc::new(ScriptedGateway::new());
    let (worker, metrics) = worker_with(Arc::new(index), Arc::new(mirror), gateway.clone());

    let summary = worker.run_at(now).await.unwrap();

    assert!(summary.lease_acquired);
    assert_eq!(summary.disputes_selected, 1);
    assert_eq!(summary.votes_considered, 3);
    assert_eq!(summary.votes_revealed, 3);
    assert_eq!(summary.votes_skipped, 0);
    assert_eq!(summary.votes_failed, 0);
    assert!(summary.succeeded());

    let submissions = gateway.submissions();
    assert_eq!(submissions.len(), 3);
    let nonces: Vec<u64> = submissions.iter().map(|(_, _, nonce)| *nonce).collect();
    assert_eq!(nonces, vec![0, 1, 2]);
    assert!(submissions.iter().all(|(arb, _, _)| *arb == arbitrator()));
    assert_eq!(gateway.confirmations().len(), 3);

    assert_eq!(metrics.get_counter(metric_names::VOTES_REVEALED).await, 3);
    assert_eq!(metrics.get_counter(metric_names::RUNS_COMPLETED).await, 1);
}

#[tokio::test]
async fn second_pass_is_idempotent_via_ledger_receipts() {
    // The index keeps listing both votes as unrevealed, as it would while
    // the external indexer lags; only the on-chain receipt stops a
    // double-submission.
    let now = fixed_now();
    let dispute = reveal_window_dispute(8, now);
    let votes = [
        committed_vote(8, voter(0x31), 0xD1),
        committed_vote(8, voter(0x32), 0xD2),
    ];

    let mut index = StaticIndex::new().with_dispute(dispute);
    let mut mirror = StaticMirror::new();
    for vote in &votes {
        index = index.with_vote(vote.clone());
        mirror = mirror.with_entry(
            mirror_key_of(vote),
            saved_vote_for(vote, Party::Challenger, 0x61),
        );
    }

    let gateway = Arc::new(ScriptedGateway::new());
    let (worker, metrics) = worker_with(Arc::new(index), Arc::new(mirror), gateway.clone());

    let first = worker.run_at(now).await.unwrap();
    assert_eq!(first.votes_revealed, 2);
    assert_eq!(first.votes_skipped, 0);

    let second = worker.run_at(now).await.unwrap();
    assert_eq!(second.votes_considered, 2);
    assert_eq!(second.votes_revealed, 0);
    assert_eq!(second.votes_skipped, 2);
    assert!(second.succeeded());

    assert_eq!(gateway.submissions().len(), 2);
    assert_eq!(metrics.get_counter(metric_names::VOTES_SKIPPED).await, 2);
    assert_eq!(metrics.get_counter(metric_names::RUNS_COMPLETED).await, 2);
}

#[tokio::test]
async fn votes_already_revealed_by_their_owners_are_skipped() {
    let now = fixed_now();
    let dispute = reveal_window_dispute(11, now);
    let self_revealed = committed_vote(11, voter(0x41), 0xE1);
    let waiting = committed_vote(11, voter(0x42), 0xE2);

    let index = StaticIndex::new()
        .with_dispute(dispute)
        .with_vote(self_revealed.clone())
        .with_vote(waiting.clone());
    let mirror = StaticMirror::new()
        .with_entry(
            mirror_key_of(&self_revealed),
            saved_vote_for(&self_revealed, Party::Requester, 0x71),
        )
        .with_entry(
            mirror_key_of(&waiting),
            saved_vote_for(&waiting, Party::Requester, 0x72),
        );

    let gateway = Arc::new(
        ScriptedGateway::new().with_revealed(arbitrator(), 11, self_revealed.voter),
    );
    let (worker, _) = worker_with(Arc::new(index), Arc::new(mirror), gateway.clone());

    let summary = worker.run_at(now).await.unwrap();

    assert_eq!(summary.votes_revealed, 1);
    assert_eq!(summary.votes_skipped, 1);

    let submissions = gateway.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].1.voter, waiting.voter);
}

#[tokio::test]
async fn failed_submission_spares_the_rest_and_burns_no_nonce() {
    let now = fixed_now();
    let dispute = reveal_window_dispute(12, now);
    let votes = [
        committed_vote(12, voter(0x51), 0xF1),
        committed_vote(12, voter(0x52), 0xF2),
        committed_vote(12, voter(0x53), 0xF3),
    ];

    let mut index = StaticIndex::new().with_dispute(dispute);
    let mut mirror = StaticMirror::new();
    for vote in &votes {
        index = index.with_vote(vote.clone());
        mirror = mirror.with_entry(
            mirror_key_of(vote),
            saved_vote_for(vote, Party::Requester, 0x81),
        );
    }

    // The middle voter's submission is rejected at the RPC layer.
    let gateway = Arc::new(ScriptedGateway::new().with_broken_voter(votes[1].voter));
    let (worker, metrics) = worker_with(Arc::new(index), Arc::new(mirror), gateway.clone());

    let summary = worker.run_at(now).await.unwrap();

    assert_eq!(summary.votes_considered, 3);
    assert_eq!(summary.votes_revealed, 2);
    assert_eq!(summary.votes_failed, 1);
    assert!(!summary.succeeded());

    // The failed submission never landed, so no nonce was consumed and the
    // remaining votes continue the sequence without a gap.
    let nonces: Vec<u64> = gateway
        .submissions()
        .iter()
        .map(|(_, _, nonce)| *nonce)
        .collect();
    assert_eq!(nonces, vec![0, 1]);
    assert_eq!(metrics.get_counter(metric_names::VOTES_FAILED).await, 1);
}

#[tokio::test]
async fn only_disputes_inside_their_reveal_window_are_processed() {
    let now = fixed_now();

    let in_window = reveal_window_dispute(1, now);
    let executed = reveal_window_dispute(2, now).with_executed(Party::Requester);
    let still_voting = Dispute::new(
        arbitrator(),
        3,
        CHAIN_ID,
        test_grant_id(),
        now.minus_secs(600),
        now.plus_secs(600),
        now.plus_secs(1_200),
    );
    let window_over = Dispute::new(
        arbitrator(),
        4,
        CHAIN_ID,
        test_grant_id(),
        now.minus_secs(3_600),
        now.minus_secs(1_200),
        now.minus_secs(600),
    );
    let other_chain = Dispute {
        chain_id: CHAIN_ID + 1,
        ..reveal_window_dispute(5, now)
    };

    let mut index = StaticIndex::new()
        .with_dispute(in_window)
        .with_dispute(executed)
        .with_dispute(still_voting)
        .with_dispute(window_over)
        .with_dispute(other_chain);
    let mut mirror = StaticMirror::new();
    for dispute_id in 1..=5 {
        let vote = committed_vote(dispute_id, voter(0x60 + dispute_id as u8), 0x90);
        index = index.with_vote(vote.clone());
        mirror = mirror.with_entry(
            mirror_key_of(&vote),
            saved_vote_for(&vote, Party::Requester, 0x91),
        );
    }

    let gateway = Arc::new(ScriptedGateway::new());
    let (worker, _) = worker_with(Arc::new(index), Arc::new(mirror), gateway.clone());

    let summary = worker.run_at(now).await.unwrap();

    assert_eq!(summary.disputes_selected, 1);
    assert_eq!(summary.votes_revealed, 1);

    let submissions = gateway.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].1.dispute_id, 1);
}

#[tokio::test]
async fn later_passes_pick_up_votes_committed_in_between() {
    let now = fixed_now();
    let dispute = reveal_window_dispute(13, now);
    let early = committed_vote(13, voter(0x71), 0xA1);
    let late = committed_vote(13, voter(0x72), 0xA2);

    let first_index = StaticIndex::new()
        .with_dispute(dispute.clone())
        .with_vote(early.clone());
    let mirror = Arc::new(
        StaticMirror::new()
            .with_entry(mirror_key_of(&early), saved_vote_for(&early, Party::Requester, 0xB1))
            .with_entry(mirror_key_of(&late), saved_vote_for(&late, Party::Challenger, 0xB2)),
    );

    let gateway = Arc::new(ScriptedGateway::new());
    let (worker, _) = worker_with(Arc::new(first_index), mirror.clone(), gateway.clone());
    assert_eq!(worker.run_at(now).await.unwrap().votes_revealed, 1);

    // The indexer observes another commit; the next pass reveals only it.
    let second_index = StaticIndex::new()
        .with_dispute(dispute)
        .with_vote(early)
        .with_vote(late.clone());
    let (worker, _) = worker_with(Arc::new(second_index), mirror, gateway.clone());

    let summary = worker.run_at(Timestamp(now.as_secs() + 30)).await.unwrap();
    assert_eq!(summary.votes_revealed, 1);
    assert_eq!(summary.votes_skipped, 1);

    let nonces: Vec<u64> = gateway
        .submissions()
        .iter()
        .map(|(_, _, nonce)| *nonce)
        .collect();
    assert_eq!(nonces, vec![0, 1]);
    assert_eq!(gateway.submissions()[1].1.voter, late.voter);
}
