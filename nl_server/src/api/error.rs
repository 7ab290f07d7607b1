//! HTTP rendering of ledger failures.
//!
//! Every error leaves the server as `{"error": <message>, "kind": <kind>}`
//! with a status derived from the kind alone.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use neon_ledger::LedgerError;
use serde::Serialize;

use crate::metrics;

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

/// Failure of an API request
#[derive(Debug)]
pub enum ApiError {
    /// A ledger operation failed
    Ledger(LedgerError),
    /// Missing, malformed or expired bearer token
    Unauthorized(&'static str),
    /// Request is well-formed JSON but carries an unusable value
    BadRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Ledger(err) => err.kind(),
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::BadRequest(_) => "invalid_request",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Ledger(err) => ledger_status(err),
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Ledger(err) => err.client_message(),
            ApiError::Unauthorized(reason) => (*reason).to_string(),
            ApiError::BadRequest(reason) => reason.clone(),
        }
    }
}

/// Status code for a ledger error
pub fn ledger_status(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::InvalidAmount(_)
        | LedgerError::InvalidGameType(_)
        | LedgerError::InvalidGameResult(_)
        | LedgerError::InvalidMethod(_)
        | LedgerError::InvalidDecision(_)
        | LedgerError::InvalidSettings(_) => StatusCode::BAD_REQUEST,
        LedgerError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
        LedgerError::Forbidden(_) => StatusCode::FORBIDDEN,
        LedgerError::WalletNotFound(_) | LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::AlreadyProcessed(_) => StatusCode::CONFLICT,
        LedgerError::StorageConflict | LedgerError::StorageUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        match &self {
            ApiError::Ledger(err) if !err.is_client_fault() => {
                tracing::error!(kind = kind, error = %err, "Ledger operation failed");
            }
            other => {
                tracing::debug!(kind = kind, status = %status, "Request rejected: {other:?}");
            }
        }
        metrics::api_errors_total(kind);

        let body = ErrorResponse {
            error: self.message(),
            kind,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_status_table() {
        let cases = [
            (LedgerError::InvalidAmount(Decimal::ZERO), StatusCode::BAD_REQUEST),
            (LedgerError::InvalidGameType("poker".into()), StatusCode::BAD_REQUEST),
            (LedgerError::InvalidGameResult("x".into()), StatusCode::BAD_REQUEST),
            (LedgerError::InvalidMethod("cash".into()), StatusCode::BAD_REQUEST),
            (LedgerError::InvalidDecision("maybe".into()), StatusCode::BAD_REQUEST),
            (
                LedgerError::InsufficientBalance {
                    available: Decimal::ONE,
                    required: Decimal::TEN,
                },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (LedgerError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (LedgerError::WalletNotFound("u".into()), StatusCode::NOT_FOUND),
            (LedgerError::NotFound("r".into()), StatusCode::NOT_FOUND),
            (LedgerError::AlreadyProcessed("r".into()), StatusCode::CONFLICT),
            (LedgerError::StorageConflict, StatusCode::SERVICE_UNAVAILABLE),
            (
                LedgerError::StorageUnavailable("db down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ledger_status(&err), expected, "{}", err.kind());
        }
    }

    #[test]
    fn test_storage_details_not_leaked() {
        let err = ApiError::from(LedgerError::StorageUnavailable(
            "connection refused at 10.0.0.5".into(),
        ));
        assert!(!err.message().contains("10.0.0.5"));
        assert_eq!(err.kind(), "storage_unavailable");
    }

    #[test]
    fn test_unauthorized_kind() {
        let err = ApiError::Unauthorized("Missing bearer token");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.kind(), "unauthorized");
    }
}
