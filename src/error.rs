/// Unified error types for the Palisade auth service
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::FieldError;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum AuthError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Input validation failures (field-level detail is safe to reveal)
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Credential mismatch or unknown account. One message for both, so
    /// responses cannot be used to enumerate registered emails.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Account locked after repeated failures
    #[error("Account temporarily locked")]
    AccountLocked { minutes_remaining: i64 },

    /// Soft-deleted account
    #[error("Account is deactivated")]
    AccountInactive,

    /// No bearer token or cookie on a protected route
    #[error("Authentication token missing")]
    TokenMissing,

    /// Access token past its expiry
    #[error("Authentication token expired")]
    TokenExpired,

    /// Bad signature, malformed token, or stale claims
    #[error("Authentication token invalid")]
    TokenInvalid,

    /// Refresh token unknown, expired, or revoked
    #[error("Refresh token invalid")]
    RefreshTokenInvalid,

    /// Actor's role is not in the allowed set for the route
    #[error("Insufficient role")]
    Forbidden {
        required: Vec<String>,
        actual: String,
    },

    /// Actor is neither the resource owner nor an allowed elevated role
    #[error("Access to another account denied")]
    OwnershipViolation,

    /// Non-admin tried to set a privileged field
    #[error("Privilege escalation attempt")]
    PrivilegeEscalation,

    /// Admin tried to deactivate their own account
    #[error("Self-deactivation not allowed")]
    SelfDeactivation,

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Email already registered
    #[error("Email already in use")]
    DuplicateEmail,

    /// No reset code on file, or the code's window has elapsed
    #[error("Reset code invalid or expired")]
    ResetCodeInvalidOrExpired,

    /// Reset code present and fresh, but the digits do not match
    #[error("Reset code invalid")]
    ResetCodeInvalid,

    /// Fixed-window quota exhausted
    #[error("Rate limit exceeded")]
    RateLimited {
        retry_after: std::time::Duration,
        limit: u32,
    },

    /// JWT signing/encoding failures (never verification outcomes)
    #[error("JWT error: {0}")]
    Jwt(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Startup configuration problems (never produced after boot)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

/// Convert AuthError to HTTP response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, message, context) = match &self {
            AuthError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Validation failed".to_string(),
                Some(serde_json::json!({ "fields": fields })),
            ),
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
                None,
            ),
            AuthError::AccountLocked { minutes_remaining } => (
                StatusCode::UNAUTHORIZED,
                "ACCOUNT_LOCKED",
                format!(
                    "Account temporarily locked. Try again in {} minute(s)",
                    minutes_remaining
                ),
                Some(serde_json::json!({ "minutesRemaining": minutes_remaining })),
            ),
            AuthError::AccountInactive => (
                StatusCode::UNAUTHORIZED,
                "ACCOUNT_INACTIVE",
                "Account is deactivated. Contact support".to_string(),
                None,
            ),
            AuthError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_MISSING",
                "Authentication token missing".to_string(),
                None,
            ),
            AuthError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_EXPIRED",
                "Authentication token expired".to_string(),
                None,
            ),
            AuthError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_INVALID",
                "Authentication token invalid".to_string(),
                None,
            ),
            AuthError::RefreshTokenInvalid => (
                StatusCode::UNAUTHORIZED,
                "REFRESH_TOKEN_INVALID",
                "Refresh token invalid or expired".to_string(),
                None,
            ),
            AuthError::Forbidden { required, actual } => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN_ROLE",
                "Insufficient role for this operation".to_string(),
                Some(serde_json::json!({
                    "requiredRoles": required,
                    "yourRole": actual,
                })),
            ),
            AuthError::OwnershipViolation => (
                StatusCode::FORBIDDEN,
                "IDOR_PROTECTION",
                "You can only access your own account".to_string(),
                None,
            ),
            AuthError::PrivilegeEscalation => (
                StatusCode::FORBIDDEN,
                "PRIVILEGE_ESCALATION_ATTEMPT",
                "Only administrators can change roles".to_string(),
                None,
            ),
            AuthError::SelfDeactivation => (
                StatusCode::BAD_REQUEST,
                "SELF_DELETE_PREVENTED",
                "You cannot deactivate your own admin account".to_string(),
                None,
            ),
            AuthError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Not found: {}", what),
                None,
            ),
            AuthError::DuplicateEmail => (
                StatusCode::CONFLICT,
                "EMAIL_IN_USE",
                "Email already registered".to_string(),
                None,
            ),
            AuthError::ResetCodeInvalidOrExpired => (
                StatusCode::BAD_REQUEST,
                "RESET_CODE_INVALID_OR_EXPIRED",
                "Reset code is invalid or has expired".to_string(),
                None,
            ),
            AuthError::ResetCodeInvalid => (
                StatusCode::BAD_REQUEST,
                "RESET_CODE_INVALID",
                "Reset code is invalid".to_string(),
                None,
            ),
            AuthError::RateLimited { retry_after, .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Too many requests. Try again later".to_string(),
                Some(serde_json::json!({ "retryAfter": retry_after.as_secs() })),
            ),
            AuthError::Database(_)
            | AuthError::Internal(_)
            | AuthError::Io(_)
            | AuthError::Config(_)
            | AuthError::Jwt(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "Internal server error".to_string(), // Don't leak details
                None,
            ),
        };

        let rate_limit = match &self {
            AuthError::RateLimited { retry_after, limit } => {
                Some((retry_after.as_secs(), *limit))
            }
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            context,
        });

        let mut response = (status, body).into_response();
        if let Some((secs, limit)) = rate_limit {
            let headers = response.headers_mut();
            headers.insert(header::RETRY_AFTER, HeaderValue::from(secs));
            headers.insert("RateLimit-Limit", HeaderValue::from(limit));
            headers.insert("RateLimit-Remaining", HeaderValue::from(0u32));
            headers.insert("RateLimit-Reset", HeaderValue::from(secs));
        }
        response
    }
}

/// Result type alias for service operations
pub type AuthResult<T> = Result<T, AuthError>;
