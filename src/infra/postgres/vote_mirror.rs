//! PostgreSQL-backed encrypted vote mirror.
//!
//! Blobs are AES-256-GCM envelopes bound to their mirror key through the
//! AAD, so a ciphertext copied to another slot fails authentication.

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use crate::crypto::{
    compute_mirror_at_rest_aad, decrypt_at_rest, encrypt_at_rest, parse_encryption_key,
    EncryptionKey,
};
use crate::domain::{MirrorKey, SavedVote};
use crate::infra::error::{Result, RevealerError};
use crate::infra::traits::VoteMirror;

/// PostgreSQL vote mirror
pub struct PgVoteMirror {
    pool: PgPool,
    key: EncryptionKey,
}

impl PgVoteMirror {
    pub fn new(pool: PgPool, key: EncryptionKey) -> Self {
        Self { pool, key }
    }

    /// Build from `MIRROR_ENCRYPTION_KEY` (32 bytes, hex or base64).
    pub fn from_env(pool: PgPool) -> Result<Self> {
        let raw = std::env::var("MIRROR_ENCRYPTION_KEY").map_err(|_| {
            RevealerError::Configuration("MIRROR_ENCRYPTION_KEY must be set".to_string())
        })?;
        let key = parse_encryption_key(&raw)
            .map_err(|e| RevealerError::Configuration(format!("MIRROR_ENCRYPTION_KEY: {e}")))?;
        Ok(Self::new(pool, key))
    }

    /// Store a vote under its mirror key. Slots are write-once: a second
    /// write to the same key is a no-op, matching the commit-time semantics
    /// of the mirroring job.
    pub async fn put(&self, key: &MirrorKey, vote: &SavedVote) -> Result<()> {
        let plaintext = serde_json::to_vec(vote)
            .map_err(|e| RevealerError::Internal(format!("serialize saved vote: {e}")))?;
        let aad = compute_mirror_at_rest_aad(&key.0);
        let blob = encrypt_at_rest(&self.key, &aad, &plaintext)?;

        sqlx::query(
            r#"
            INSERT INTO vote_mirror (mirror_key, ciphertext)
            VALUES ($1, $2)
            ON CONFLICT (mirror_key) DO NOTHING
            "#,
        )
        .bind(key.as_bytes())
        .bind(&blob)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl VoteMirror for PgVoteMirror {
    async fn get(&self, key: &MirrorKey) -> Result<Option<SavedVote>> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT ciphertext FROM vote_mirror WHERE mirror_key = $1")
                .bind(key.as_bytes())
                .fetch_optional(&self.pool)
                .await?;

        let Some((blob,)) = row else {
            return Ok(None);
        };

        let aad = compute_mirror_at_rest_aad(&key.0);
        let plaintext = decrypt_at_rest(&self.key, &aad, &blob)?;
        let vote: SavedVote = serde_json::from_slice(&plaintext)
            .map_err(|e| RevealerError::MalformedSavedVote(e.to_string()))?;

        Ok(Some(vote))
    }
}
