//! PostgreSQL-backed dispute index.
//!
//! Reads the grants, disputes, and dispute_votes tables maintained by the
//! external event mirroring job. This side never writes them.

use std::str::FromStr;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::domain::{Dispute, DisputeVote, Grant, GrantStatus, Party, Timestamp};
use crate::infra::error::{Result, RevealerError};
use crate::infra::traits::DisputeIndex;

/// Database row for grants
#[derive(sqlx::FromRow)]
struct GrantRow {
    id: Uuid,
    listing_address: String,
    status: String,
    is_disputed: bool,
    is_resolved: bool,
    is_active: bool,
    challenge_period_ends_at: i64,
}

/// Database row for disputes
#[derive(sqlx::FromRow)]
struct DisputeRow {
    arbitrator: String,
    dispute_id: i64,
    chain_id: i64,
    grant_id: Uuid,
    voting_start_time: i64,
    voting_end_time: i64,
    reveal_period_end_time: i64,
    is_executed: bool,
    ruling: i16,
}

/// Database row for dispute votes
#[derive(sqlx::FromRow)]
struct VoteRow {
    arbitrator: String,
    dispute_id: i64,
    voter: String,
    commit_hash: Vec<u8>,
    choice: Option<i16>,
    reason: Option<String>,
    salt: Option<Vec<u8>>,
}

/// Canonical storage form for addresses: 0x-prefixed lowercase hex.
pub(crate) fn addr_text(addr: &Address) -> String {
    format!("{addr:#x}")
}

fn parse_address(text: &str, field: &str) -> Result<Address> {
    Address::from_str(text)
        .map_err(|_| RevealerError::Internal(format!("invalid {field} address: {text}")))
}

fn parse_bytes32(bytes: &[u8], field: &str) -> Result<B256> {
    B256::try_from(bytes).map_err(|_| {
        RevealerError::Internal(format!("invalid {field} length: {}", bytes.len()))
    })
}

fn parse_party(value: i16, field: &str) -> Result<Party> {
    u8::try_from(value)
        .ok()
        .and_then(Party::from_u8)
        .ok_or_else(|| RevealerError::Internal(format!("invalid {field} value: {value}")))
}

fn row_to_grant(row: GrantRow) -> Result<Grant> {
    Ok(Grant {
        id: row.id,
        listing_address: parse_address(&row.listing_address, "listing")?,
        status: GrantStatus::parse(&row.status).ok_or_else(|| {
            RevealerError::Internal(format!("unknown grant status: {}", row.status))
        })?,
        is_disputed: row.is_disputed,
        is_resolved: row.is_resolved,
        is_active: row.is_active,
        challenge_period_ends_at: Timestamp(row.challenge_period_ends_at),
    })
}

fn row_to_dispute(row: DisputeRow) -> Result<Dispute> {
    Ok(Dispute {
        arbitrator: parse_address(&row.arbitrator, "arbitrator")?,
        dispute_id: row.dispute_id as u64,
        chain_id: row.chain_id as u64,
        grant_id: row.grant_id,
        voting_start_time: Timestamp(row.voting_start_time),
        voting_end_time: Timestamp(row.voting_end_time),
        reveal_period_end_time: Timestamp(row.reveal_period_end_time),
        is_executed: row.is_executed,
        ruling: parse_party(row.ruling, "ruling")?,
    })
}

fn row_to_vote(row: VoteRow) -> Result<DisputeVote> {
    Ok(DisputeVote {
        arbitrator: parse_address(&row.arbitrator, "arbitrator")?,
        dispute_id: row.dispute_id as u64,
        voter: parse_address(&row.voter, "voter")?,
        commit_hash: parse_bytes32(&row.commit_hash, "commit_hash")?,
        choice: row.choice.map(|c| parse_party(c, "choice")).transpose()?,
        reason: row.reason,
        salt: row
            .salt
            .as_deref()
            .map(|s| parse_bytes32(s, "salt"))
            .transpose()?,
    })
}

/// PostgreSQL dispute index
pub struct PgDisputeIndex {
    pool: PgPool,
}

impl PgDisputeIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DisputeIndex for PgDisputeIndex {
    async fn disputes_in_reveal_window(
        &self,
        now: Timestamp,
        chain_id: u64,
    ) -> Result<Vec<Dispute>> {
        let rows: Vec<DisputeRow> = sqlx::query_as(
            r#"
            SELECT arbitrator, dispute_id, chain_id, grant_id,
                   voting_start_time, voting_end_time, reveal_period_end_time,
                   is_executed, ruling
            FROM disputes
            WHERE NOT is_executed
              AND voting_end_time < $1
              AND reveal_period_end_time > $1
              AND chain_id = $2
            ORDER BY arbitrator, dispute_id
            "#,
        )
        .bind(now.as_secs())
        .bind(chain_id as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_dispute).collect()
    }

    async fn unrevealed_votes(
        &self,
        arbitrator: Address,
        dispute_id: u64,
    ) -> Result<Vec<DisputeVote>> {
        let rows: Vec<VoteRow> = sqlx::query_as(
            r#"
            SELECT arbitrator, dispute_id, voter, commit_hash, choice, reason, salt
            FROM dispute_votes
            WHERE arbitrator = $1 AND dispute_id = $2 AND choice IS NULL
            ORDER BY created_at, voter
            "#,
        )
        .bind(addr_text(&arbitrator))
        .bind(dispute_id as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_vote).collect()
    }

    async fn grant(&self, id: Uuid) -> Result<Option<Grant>> {
        let row: Option<GrantRow> = sqlx::query_as(
            r#"
            SELECT id, listing_address, status, is_disputed, is_resolved,
                   is_active, challenge_period_ends_at
            FROM grants
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_grant).transpose()
    }

    async fn dispute(&self, arbitrator: Address, dispute_id: u64) -> Result<Option<Dispute>> {
        let row: Option<DisputeRow> = sqlx::query_as(
            r#"
            SELECT arbitrator, dispute_id, chain_id, grant_id,
                   voting_start_time, voting_end_time, reveal_period_end_time,
                   is_executed, ruling
            FROM disputes
            WHERE arbitrator = $1 AND dispute_id = $2
            "#,
        )
        .bind(addr_text(&arbitrator))
        .bind(dispute_id as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_dispute).transpose()
    }

    async fn dispute_for_grant(&self, grant_id: Uuid) -> Result<Option<Dispute>> {
        let row: Option<DisputeRow> = sqlx::query_as(
            r#"
            SELECT arbitrator, dispute_id, chain_id, grant_id,
                   voting_start_time, voting_end_time, reveal_period_end_time,
                   is_executed, ruling
            FROM disputes
            WHERE grant_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(grant_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_dispute).transpose()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_row_converts_and_validates() {
        let listing = Address::repeat_byte(0xAA);
        let row = GrantRow {
            id: Uuid::new_v4(),
            listing_address: addr_text(&listing),
            status: "registration_requested".to_string(),
            is_disputed: true,
            is_resolved: false,
            is_active: false,
            challenge_period_ends_at: 1_700_000_000,
        };

        let grant = row_to_grant(row).unwrap();
        assert_eq!(grant.status, GrantStatus::RegistrationRequested);
        assert_eq!(grant.listing_address, listing);
        assert!(grant.is_disputed);
        assert_eq!(grant.challenge_period_ends_at, Timestamp(1_700_000_000));
    }

    #[test]
    fn grant_row_rejects_unknown_status() {
        let row = GrantRow {
            id: Uuid::new_v4(),
            listing_address: addr_text(&Address::repeat_byte(0x11)),
            status: "limbo".to_string(),
            is_disputed: false,
            is_resolved: false,
            is_active: false,
            challenge_period_ends_at: 0,
        };

        assert!(matches!(
            row_to_grant(row),
            Err(RevealerError::Internal(_))
        ));
    }

    #[test]
    fn vote_row_preserves_null_reveal_fields() {
        let row = VoteRow {
            arbitrator: addr_text(&Address::repeat_byte(0xA1)),
            dispute_id: 7,
            voter: addr_text(&Address::repeat_byte(0xB2)),
            commit_hash: vec![0xC3; 32],
            choice: None,
            reason: None,
            salt: None,
        };

        let vote = row_to_vote(row).unwrap();
        assert!(!vote.is_revealed());
        assert_eq!(vote.commit_hash, B256::repeat_byte(0xC3));
    }

    #[test]
    fn vote_row_rejects_short_commit_hash() {
        let row = VoteRow {
            arbitrator: addr_text(&Address::repeat_byte(0xA1)),
            dispute_id: 7,
            voter: addr_text(&Address::repeat_byte(0xB2)),
            commit_hash: vec![0xC3; 31],
            choice: None,
            reason: None,
            salt: None,
        };

        assert!(row_to_vote(row).is_err());
    }

    #[test]
    fn dispute_row_rejects_out_of_range_ruling() {
        let row = DisputeRow {
            arbitrator: addr_text(&Address::repeat_byte(0xA1)),
            dispute_id: 7,
            chain_id: 1,
            grant_id: Uuid::new_v4(),
            voting_start_time: 100,
            voting_end_time: 200,
            reveal_period_end_time: 300,
            is_executed: true,
            ruling: 3,
        };

        assert!(row_to_dispute(row).is_err());
    }

    #[test]
    fn addresses_store_as_lowercase_hex() {
        let addr = Address::repeat_byte(0xAB);
        let text = addr_text(&addr);
        assert_eq!(text, "0xabababababababababababababababababababab");
        assert_eq!(parse_address(&text, "test").unwrap(), addr);
    }
}
