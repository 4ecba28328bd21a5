//! Grant (registry listing) snapshot model.

use std::fmt;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::Timestamp;

/// Registry status of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    /// Not currently in the registry.
    Absent,
    /// Listed; no request pending.
    Registered,
    /// A listing request is pending its challenge period.
    RegistrationRequested,
    /// A removal request is pending its challenge period.
    ClearingRequested,
}

impl GrantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantStatus::Absent => "absent",
            GrantStatus::Registered => "registered",
            GrantStatus::RegistrationRequested => "registration_requested",
            GrantStatus::ClearingRequested => "clearing_requested",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "absent" => Some(GrantStatus::Absent),
            "registered" => Some(GrantStatus::Registered),
            "registration_requested" => Some(GrantStatus::RegistrationRequested),
            "clearing_requested" => Some(GrantStatus::ClearingRequested),
            _ => None,
        }
    }

    /// Whether a request is pending (the only statuses that can be
    /// challenged or executed).
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            GrantStatus::RegistrationRequested | GrantStatus::ClearingRequested
        )
    }
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time snapshot of a grant, mirrored from ledger events.
///
/// `is_disputed` holds only while an undecided dispute exists; a grant has at
/// most one open dispute at a time. `is_resolved` is set once a dispute on it
/// has been executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub id: Uuid,
    pub listing_address: Address,
    pub status: GrantStatus,
    pub is_disputed: bool,
    pub is_resolved: bool,
    pub is_active: bool,
    pub challenge_period_ends_at: Timestamp,
}

impl Grant {
    pub fn new(
        listing_address: Address,
        status: GrantStatus,
        challenge_period_ends_at: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            listing_address,
            status,
            is_disputed: false,
            is_resolved: false,
            is_active: false,
            challenge_period_ends_at,
        }
    }

    pub fn with_disputed(mut self, disputed: bool) -> Self {
        self.is_disputed = disputed;
        self
    }

    pub fn with_resolved(mut self, resolved: bool) -> Self {
        self.is_resolved = resolved;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }
}
