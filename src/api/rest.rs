//! REST API endpoints for the registry revealer.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use alloy::primitives::Address;

use crate::api::error::{validation_error, ApiError, ErrorCode};
use crate::domain::{
    can_be_challenged, can_dispute_be_executed, can_dispute_be_voted_on, can_request_be_executed,
    dispute_phase, is_dispute_resolved_for_none_party, is_dispute_revealing_votes,
    is_request_rejected, Dispute, DisputePhase, Grant, GrantStatus, Party, Timestamp,
};
use crate::server::AppState;
use crate::worker::{RevealWorkerMessage, RunSummary};

/// Build the `/api` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/grants/:grant_id/actions", get(get_grant_actions))
        .route(
            "/v1/disputes/:arbitrator/:dispute_id/phase",
            get(get_dispute_phase),
        )
        .route("/v1/disputes/reveal-window", get(list_reveal_window))
        .route("/v1/jobs/reveal", post(trigger_reveal_run))
}

fn parse_arbitrator(raw: &str) -> Result<Address, ApiError> {
    Address::from_str(raw)
        .map_err(|e| validation_error("arbitrator", format!("Invalid arbitrator address: {}", e)))
}

/// The evaluation instant for phase predicates. Defaults to the wall clock;
/// `?at=<unix seconds>` pins it for reproducible queries.
#[derive(Debug, Deserialize)]
struct AsOfQuery {
    at: Option<i64>,
}

impl AsOfQuery {
    fn resolve(&self) -> Timestamp {
        self.at.map(Timestamp::from).unwrap_or_else(Timestamp::now)
    }
}

// ============================================================================
// Grant eligibility
// ============================================================================

/// Actions currently available on a grant, derived from its snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct GrantActionsResponse {
    pub grant_id: Uuid,
    pub listing_address: String,
    pub status: GrantStatus,
    pub as_of: i64,
    pub can_be_challenged: bool,
    pub can_request_be_executed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispute: Option<DisputeStatus>,
}

/// Status of the most recent dispute against a grant.
#[derive(Debug, Serialize, Deserialize)]
pub struct DisputeStatus {
    pub arbitrator: String,
    pub dispute_id: u64,
    pub phase: DisputePhase,
    pub can_be_voted_on: bool,
    pub is_revealing_votes: bool,
    pub can_be_executed: bool,
    pub is_executed: bool,
    pub ruling: Party,
    pub resolved_for_none_party: bool,
    pub request_rejected: bool,
}

fn dispute_status(grant: &Grant, dispute: &Dispute, now: Timestamp) -> DisputeStatus {
    DisputeStatus {
        arbitrator: format!("{:#x}", dispute.arbitrator),
        dispute_id: dispute.dispute_id,
        phase: dispute_phase(dispute, now),
        can_be_voted_on: can_dispute_be_voted_on(dispute, now),
        is_revealing_votes: is_dispute_revealing_votes(dispute, now),
        can_be_executed: can_dispute_be_executed(dispute, now),
        is_executed: dispute.is_executed,
        ruling: dispute.ruling,
        resolved_for_none_party: is_dispute_resolved_for_none_party(dispute),
        request_rejected: is_request_rejected(grant, dispute),
    }
}

async fn get_grant_actions(
    State(state): State<AppState>,
    Path(grant_id): Path<Uuid>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<GrantActionsResponse>, ApiError> {
    let now = query.resolve();

    let grant = state
        .index
        .grant(grant_id)
        .await?
        .ok_or_else(|| {
            ApiError::new(ErrorCode::GrantNotFound, format!("Grant not found: {}", grant_id))
                .with_resource_id(grant_id.to_string())
        })?;

    let dispute = state.index.dispute_for_grant(grant_id).await?;

    Ok(Json(GrantActionsResponse {
        grant_id: grant.id,
        listing_address: format!("{:#x}", grant.listing_address),
        status: grant.status,
        as_of: now.as_secs(),
        can_be_challenged: can_be_challenged(&grant, now),
        can_request_be_executed: can_request_be_executed(&grant, now),
        dispute: dispute.map(|d| dispute_status(&grant, &d, now)),
    }))
}

// ============================================================================
// Dispute phase
// ============================================================================

/// Derived phase plus the raw timestamps it was derived from.
#[derive(Debug, Serialize, Deserialize)]
pub struct DisputePhaseResponse {
    pub arbitrator: String,
    pub dispute_id: u64,
    pub chain_id: u64,
    pub grant_id: Uuid,
    pub phase: DisputePhase,
    pub as_of: i64,
    pub voting_start_time: i64,
    pub voting_end_time: i64,
    pub reveal_period_end_time: i64,
    pub is_executed: bool,
    pub ruling: Party,
}

fn dispute_phase_response(dispute: &Dispute, now: Timestamp) -> DisputePhaseResponse {
    DisputePhaseResponse {
        arbitrator: format!("{:#x}", dispute.arbitrator),
        dispute_id: dispute.dispute_id,
        chain_id: dispute.chain_id,
        grant_id: dispute.grant_id,
        phase: dispute_phase(dispute, now),
        as_of: now.as_secs(),
        voting_start_time: dispute.voting_start_time.as_secs(),
        voting_end_time: dispute.voting_end_time.as_secs(),
        reveal_period_end_time: dispute.reveal_period_end_time.as_secs(),
        is_executed: dispute.is_executed,
        ruling: dispute.ruling,
    }
}

async fn get_dispute_phase(
    State(state): State<AppState>,
    Path((arbitrator, dispute_id)): Path<(String, u64)>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<DisputePhaseResponse>, ApiError> {
    let arbitrator = parse_arbitrator(&arbitrator)?;
    let now = query.resolve();

    let dispute = state
        .index
        .dispute(arbitrator, dispute_id)
        .await?
        .ok_or_else(|| {
            ApiError::new(
                ErrorCode::DisputeNotFound,
                format!("Dispute not found: {:#x}/{}", arbitrator, dispute_id),
            )
        })?;

    Ok(Json(dispute_phase_response(&dispute, now)))
}

// ============================================================================
// Reveal window listing
// ============================================================================

#[derive(Debug, Deserialize)]
struct RevealWindowQuery {
    chain_id: Option<u64>,
    at: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RevealWindowResponse {
    pub disputes: Vec<DisputePhaseResponse>,
    pub total: usize,
    pub chain_id: u64,
    pub as_of: i64,
}

async fn list_reveal_window(
    State(state): State<AppState>,
    Query(query): Query<RevealWindowQuery>,
) -> Result<Json<RevealWindowResponse>, ApiError> {
    let chain_id = query.chain_id.unwrap_or(state.chain_id);
    let now = query.at.map(Timestamp::from).unwrap_or_else(Timestamp::now);

    let disputes = state.index.disputes_in_reveal_window(now, chain_id).await?;
    let disputes: Vec<DisputePhaseResponse> = disputes
        .iter()
        .map(|d| dispute_phase_response(d, now))
        .collect();

    Ok(Json(RevealWindowResponse {
        total: disputes.len(),
        disputes,
        chain_id,
        as_of: now.as_secs(),
    }))
}

// ============================================================================
// Reveal job trigger
// ============================================================================

/// Outcome of a manually triggered reveal pass.
///
/// Per-vote failures are reported in the counts, not as an HTTP error: the
/// request succeeds whenever a pass ran to completion. `ok` is false only
/// when the pass itself could not execute.
#[derive(Debug, Serialize, Deserialize)]
pub struct RevealJobResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub summary: RunSummary,
}

async fn trigger_reveal_run(
    State(state): State<AppState>,
) -> Result<Json<RevealJobResponse>, ApiError> {
    let (respond_to, response) = oneshot::channel();

    state
        .reveal_worker
        .send(RevealWorkerMessage::RunNow { respond_to })
        .await
        .map_err(|_| {
            ApiError::new(
                ErrorCode::ServiceUnavailable,
                "Reveal worker is not running",
            )
        })?;

    let summary = response
        .await
        .map_err(|_| {
            ApiError::new(
                ErrorCode::ServiceUnavailable,
                "Reveal worker dropped the request",
            )
        })??;

    Ok(Json(RevealJobResponse { ok: true, summary }))
}
