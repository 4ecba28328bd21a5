//! Structured API error responses with error codes
//!
//! This module provides consistent error handling across all API endpoints
//! with machine-readable error codes and human-readable messages.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

// ============================================================================
// Error Codes
// ============================================================================

/// Error codes for API responses
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication errors (1xxx)
    /// No authentication credentials provided
    AuthRequired,
    /// Bearer token does not match the configured operator token
    InvalidToken,

    // Validation errors (3xxx)
    /// Request body is malformed
    InvalidRequestBody,
    /// Field value is invalid
    InvalidFieldValue,

    // Resource errors (4xxx)
    /// Requested resource not found
    ResourceNotFound,
    /// Grant not found
    GrantNotFound,
    /// Dispute not found
    DisputeNotFound,

    // Crypto errors (6xxx)
    /// Encryption/decryption failed
    EncryptionError,

    // Mirror integrity errors (7xxx)
    /// A committed vote has no entry in the vote mirror
    MirrorEntryMissing,
    /// A mirror entry failed to decrypt or decode
    MirrorEntryCorrupt,

    // Infrastructure errors (8xxx)
    /// Database operation failed
    DatabaseError,
    /// External service unavailable
    ServiceUnavailable,
    /// Operation timed out
    Timeout,
    /// Internal server error
    InternalError,

    // Ledger errors (9xxx)
    /// RPC or contract call failed
    LedgerUnavailable,
    /// Reveal transaction reverted on chain
    TransactionReverted,
    /// Transaction confirmation timed out
    ConfirmationTimeout,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn numeric_code(&self) -> u32 {
        match self {
            // Auth (1xxx)
            ErrorCode::AuthRequired => 1001,
            ErrorCode::InvalidToken => 1002,

            // Validation (3xxx)
            ErrorCode::InvalidRequestBody => 3001,
            ErrorCode::InvalidFieldValue => 3002,

            // Resource (4xxx)
            ErrorCode::ResourceNotFound => 4001,
            ErrorCode::GrantNotFound => 4002,
            ErrorCode::DisputeNotFound => 4003,

            // Crypto (6xxx)
            ErrorCode::EncryptionError => 6001,

            // Mirror integrity (7xxx)
            ErrorCode::MirrorEntryMissing => 7001,
            ErrorCode::MirrorEntryCorrupt => 7002,

            // Infrastructure (8xxx)
            ErrorCode::DatabaseError => 8001,
            ErrorCode::ServiceUnavailable => 8002,
            ErrorCode::Timeout => 8003,
            ErrorCode::InternalError => 8999,

            // Ledger (9xxx)
            ErrorCode::LedgerUnavailable => 9001,
            ErrorCode::TransactionReverted => 9002,
            ErrorCode::ConfirmationTimeout => 9003,
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Auth errors -> 401
            ErrorCode::AuthRequired => StatusCode::UNAUTHORIZED,
            ErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,

            // Validation -> 400
            ErrorCode::InvalidRequestBody => StatusCode::BAD_REQUEST,
            ErrorCode::InvalidFieldValue => StatusCode::BAD_REQUEST,

            // Resource -> 404
            ErrorCode::ResourceNotFound => StatusCode::NOT_FOUND,
            ErrorCode::GrantNotFound => StatusCode::NOT_FOUND,
            ErrorCode::DisputeNotFound => StatusCode::NOT_FOUND,

            // Crypto -> 500
            ErrorCode::EncryptionError => StatusCode::INTERNAL_SERVER_ERROR,

            // Mirror integrity -> 500
            ErrorCode::MirrorEntryMissing => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::MirrorEntryCorrupt => StatusCode::INTERNAL_SERVER_ERROR,

            // Infrastructure -> 500/503/504
            ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,

            // Ledger -> various
            ErrorCode::LedgerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::TransactionReverted => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::ConfirmationTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code_str = match self {
            ErrorCode::AuthRequired => "AUTH_REQUIRED",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::InvalidFieldValue => "INVALID_FIELD_VALUE",
            ErrorCode::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorCode::GrantNotFound => "GRANT_NOT_FOUND",
            ErrorCode::DisputeNotFound => "DISPUTE_NOT_FOUND",
            ErrorCode::EncryptionError => "ENCRYPTION_ERROR",
            ErrorCode::MirrorEntryMissing => "MIRROR_ENTRY_MISSING",
            ErrorCode::MirrorEntryCorrupt => "MIRROR_ENTRY_CORRUPT",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::LedgerUnavailable => "LEDGER_UNAVAILABLE",
            ErrorCode::TransactionReverted => "TRANSACTION_REVERTED",
            ErrorCode::ConfirmationTimeout => "CONFIRMATION_TIMEOUT",
        };
        write!(f, "{}", code_str)
    }
}

// ============================================================================
// Structured Error Response
// ============================================================================

/// Structured error response for API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error details
    pub error: ErrorDetails,
}

/// Detailed error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Numeric error code for easy categorization
    pub numeric_code: u32,

    /// Human-readable error message
    pub message: String,

    /// Unique request ID for tracing (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Related resource ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                request_id: None,
                details: None,
                resource_id: None,
            },
        }
    }

    /// Set the request ID
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.error.request_id = Some(request_id.into());
        self
    }

    /// Set additional details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    /// Set related resource ID
    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.error.resource_id = Some(id.into());
        self
    }

    /// Get the HTTP status code
    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code_str = self.error.code.to_string();
        let mut response = (status, Json(self)).into_response();

        // Add error code header for easier debugging
        if let Ok(code_value) = axum::http::HeaderValue::from_str(&code_str) {
            response.headers_mut().insert(
                axum::http::header::HeaderName::from_static("x-error-code"),
                code_value,
            );
        }

        response
    }
}

// ============================================================================
// Conversion from RevealerError
// ============================================================================

impl From<crate::infra::RevealerError> for ApiError {
    fn from(err: crate::infra::RevealerError) -> Self {
        use crate::infra::RevealerError;

        match err {
            RevealerError::Database(e) => {
                ApiError::new(ErrorCode::DatabaseError, format!("Database error: {}", e))
            }
            RevealerError::GrantNotFound(id) => {
                ApiError::new(ErrorCode::GrantNotFound, format!("Grant not found: {}", id))
                    .with_resource_id(id.to_string())
            }
            RevealerError::DisputeNotFound {
                arbitrator,
                dispute_id,
            } => ApiError::new(
                ErrorCode::DisputeNotFound,
                format!("Dispute not found: {:#x}/{}", arbitrator, dispute_id),
            )
            .with_details(serde_json::json!({
                "arbitrator": format!("{arbitrator:#x}"),
                "dispute_id": dispute_id
            })),
            RevealerError::MissingMirrorEntry {
                dispute_id,
                voter,
                commit_hash,
            } => ApiError::new(
                ErrorCode::MirrorEntryMissing,
                format!(
                    "No mirror entry for dispute {}, voter {:#x}",
                    dispute_id, voter
                ),
            )
            .with_details(serde_json::json!({
                "dispute_id": dispute_id,
                "voter": format!("{voter:#x}"),
                "commit_hash": format!("{commit_hash:#x}")
            })),
            RevealerError::MalformedSavedVote(msg) => {
                ApiError::new(ErrorCode::MirrorEntryCorrupt, msg)
            }
            RevealerError::Encryption(msg) => ApiError::new(ErrorCode::EncryptionError, msg),
            RevealerError::Ledger(msg) => ApiError::new(
                ErrorCode::LedgerUnavailable,
                format!("Ledger error: {}", msg),
            ),
            RevealerError::TxReverted { tx_hash } => ApiError::new(
                ErrorCode::TransactionReverted,
                format!("Transaction reverted: {:#x}", tx_hash),
            )
            .with_resource_id(format!("{tx_hash:#x}")),
            RevealerError::ConfirmationTimeout { tx_hash } => ApiError::new(
                ErrorCode::ConfirmationTimeout,
                format!("Confirmation timed out for transaction {:#x}", tx_hash),
            )
            .with_resource_id(format!("{tx_hash:#x}")),
            RevealerError::Configuration(msg) => ApiError::new(
                ErrorCode::InternalError,
                format!("Configuration error: {}", msg),
            ),
            RevealerError::Internal(msg) => ApiError::new(ErrorCode::InternalError, msg),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Create a not found error for a specific resource type
pub fn not_found(resource_type: &str, id: impl std::fmt::Display) -> ApiError {
    ApiError::new(
        ErrorCode::ResourceNotFound,
        format!("{} not found: {}", resource_type, id),
    )
    .with_resource_id(id.to_string())
}

/// Create a validation error with field details
pub fn validation_error(field: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::InvalidFieldValue, message.into()).with_details(serde_json::json!({
        "field": field
    }))
}

/// Create an unauthorized error
pub fn unauthorized(message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::AuthRequired, message.into())
}

/// Create an internal error
pub fn internal_error(message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::InternalError, message.into())
}

// ============================================================================
// Tests
// ============================================================================
