//! Wallet API handlers.
//!
//! Balance, ledger history and the user side of the deposit workflow. All
//! endpoints act on the authenticated caller.
//!
//! # Examples
//!
//! Submit a deposit request:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/wallet/payment-request \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"amount": "500", "paymentMethod": "upi", "transactionRef": "UTR123"}'
//! ```

use axum::{
    Json,
    extract::{Extension, Query, State},
    http::StatusCode,
};
use neon_ledger::payments::{DepositSubmission, PaymentDetails, PaymentRequest, PaymentStatus};
use neon_ledger::wallet::{Transaction, Wallet};
use neon_ledger::{LedgerStore, Principal};
use serde::Deserialize;

use super::AppState;
use super::error::{ApiError, ApiResult};

/// Largest page any listing endpoint returns
pub const MAX_PAGE_LIMIT: i64 = 500;

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

/// Clamp a caller-supplied page size into `1..=MAX_PAGE_LIMIT`
pub fn clamp_limit(limit: Option<i64>) -> Option<i64> {
    limit.map(|l| l.clamp(1, MAX_PAGE_LIMIT))
}

/// Parse an optional `status` filter
pub fn parse_status(status: Option<&str>) -> ApiResult<Option<PaymentStatus>> {
    status
        .map(|s| {
            s.parse::<PaymentStatus>()
                .map_err(|_| ApiError::BadRequest(format!("unknown status '{s}'")))
        })
        .transpose()
}

/// Caller's wallet, created empty on first access
pub async fn balance<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Wallet>> {
    let wallet = state
        .ledger
        .wallets
        .get_or_create_wallet(&principal.user_id)
        .await?;
    Ok(Json(wallet))
}

/// Caller's ledger entries, newest first
pub async fn transactions<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<Transaction>>> {
    let entries = state
        .ledger
        .wallets
        .transactions(&principal.user_id, clamp_limit(query.limit))
        .await?;
    Ok(Json(entries))
}

/// Submit a deposit request for admin review
///
/// # Errors
///
/// - `400 Bad Request`: amount not positive or method not bank/upi
pub async fn submit_payment_request<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Json(submission): Json<DepositSubmission>,
) -> ApiResult<(StatusCode, Json<PaymentRequest>)> {
    let request = state
        .ledger
        .payments
        .submit(&principal.user_id, submission)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Caller's own deposit requests, newest first
pub async fn payment_requests<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<Vec<PaymentRequest>>> {
    let status = parse_status(query.status.as_deref())?;
    // Own requests only, even for admins
    let own = Principal::user(principal.user_id);
    let requests = state.ledger.payments.list(&own, status).await?;
    Ok(Json(requests))
}

/// Account details to send a deposit to
pub async fn payment_details<S: LedgerStore>(
    State(state): State<AppState<S>>,
) -> ApiResult<Json<PaymentDetails>> {
    Ok(Json(state.ledger.payments.payment_details().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), None);
        assert_eq!(clamp_limit(Some(0)), Some(1));
        assert_eq!(clamp_limit(Some(-5)), Some(1));
        assert_eq!(clamp_limit(Some(10)), Some(10));
        assert_eq!(clamp_limit(Some(10_000)), Some(MAX_PAGE_LIMIT));
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status(None).unwrap(), None);
        assert_eq!(
            parse_status(Some("pending")).unwrap(),
            Some(PaymentStatus::Pending)
        );
        assert!(matches!(
            parse_status(Some("approved")),
            Err(ApiError::BadRequest(_))
        ));
    }
}
