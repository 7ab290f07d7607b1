//! Admin API handlers.
//!
//! Deposit review, payment details and reconciliation. Routes are mounted
//! behind the admin role guard; the ledger re-checks the role on every
//! mutation.
//!
//! # Examples
//!
//! Approve a deposit:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/admin/payment-request/req_0190.../approve \
//!   -H "Authorization: Bearer ADMIN_TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"adminNotes": "UTR verified"}'
//! ```

use axum::{
    Json,
    body::Bytes,
    extract::{Extension, Path, Query, State},
};
use chrono::Utc;
use neon_ledger::payments::{Decision, PaymentDetails, PaymentRequest};
use neon_ledger::wallet::{EntryCategory, EntryDirection, Reconciliation};
use neon_ledger::{LedgerStore, Principal};
use serde::Deserialize;

use super::AppState;
use super::error::{ApiError, ApiResult};
use super::request_id::RequestId;
use super::wallet::{StatusQuery, parse_status};
use crate::metrics;

/// Optional body of an approve/decline call
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    #[serde(default)]
    pub admin_notes: String,
}

/// Replacement deposit account details
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetailsUpdate {
    pub bank_name: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub account_holder_name: String,
    pub upi_id: String,
    pub qr_code_url: String,
}

/// Decode an optional JSON body; an empty body means defaults
fn optional_body(body: &Bytes) -> ApiResult<ProcessRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ProcessRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid body: {e}")))
}

/// Every user's deposit requests, newest first
pub async fn list_payment_requests<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(admin): Extension<Principal>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<Vec<PaymentRequest>>> {
    let status = parse_status(query.status.as_deref())?;
    Ok(Json(state.ledger.payments.list(&admin, status).await?))
}

/// Approve or decline a pending deposit request
///
/// # Errors
///
/// - `400 Bad Request`: action is neither approve nor decline
/// - `404 Not Found`: no such request
/// - `409 Conflict`: request already processed
pub async fn process_payment_request<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(admin): Extension<Principal>,
    request_id: RequestId,
    Path((id, action)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<PaymentRequest>> {
    let decision: Decision = action.parse()?;
    let notes = optional_body(&body)?.admin_notes;

    let processed = state
        .ledger
        .payments
        .process(&admin, &id, decision, &notes)
        .await?;

    metrics::payment_decisions_total(&processed.status.to_string());
    if decision == Decision::Accepted {
        metrics::ledger_mutations_total(EntryDirection::Credit, EntryCategory::Deposit);
    }
    tracing::info!(
        request_id = %request_id.as_str(),
        admin = %admin.user_id,
        payment_request = %processed.id,
        status = %processed.status,
        "Payment request processed"
    );

    Ok(Json(processed))
}

/// Replace the deposit account details
pub async fn update_payment_details<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(admin): Extension<Principal>,
    Json(update): Json<PaymentDetailsUpdate>,
) -> ApiResult<Json<PaymentDetails>> {
    let details = PaymentDetails {
        bank_name: update.bank_name,
        account_number: update.account_number,
        ifsc_code: update.ifsc_code,
        account_holder_name: update.account_holder_name,
        upi_id: update.upi_id,
        qr_code_url: update.qr_code_url,
        updated_at: Utc::now(),
    };
    let stored = state
        .ledger
        .payments
        .update_payment_details(&admin, details)
        .await?;
    Ok(Json(stored))
}

/// Replay a user's ledger against their balance
pub async fn reconcile<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Reconciliation>> {
    let check = state.ledger.wallets.reconcile(&user_id).await?;
    if !check.consistent {
        tracing::error!(
            user_id = %user_id,
            balance = %check.balance,
            ledger_sum = %check.ledger_sum,
            first_broken_entry = ?check.first_broken_entry,
            "Ledger does not reconcile"
        );
    }
    Ok(Json(check))
}
