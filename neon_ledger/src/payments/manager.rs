//! Deposit request workflow.

use chrono::Utc;
use log::info;
use std::sync::Arc;

use super::models::{
    Decision, DepositSubmission, PaymentDetails, PaymentMethod, PaymentRequest,
    PaymentRequestFilter, PaymentStatus, new_request_id,
};
use crate::auth::Principal;
use crate::config::LedgerConfig;
use crate::errors::{LedgerError, LedgerResult};
use crate::store::{LedgerStore, LedgerTx, UnitPolicy, run_unit};
use crate::wallet::{EntryCategory, credit_in, positive_amount};

/// Payment request manager
pub struct PaymentManager<S: LedgerStore> {
    store: Arc<S>,
    policy: UnitPolicy,
    currency: String,
}

impl<S: LedgerStore> Clone for PaymentManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy,
            currency: self.currency.clone(),
        }
    }
}

impl<S: LedgerStore> PaymentManager<S> {
    pub fn new(store: Arc<S>, config: &LedgerConfig) -> Self {
        Self {
            store,
            policy: UnitPolicy::from(config),
            currency: config.currency.clone(),
        }
    }

    /// Record a new deposit request in `pending`
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Amount not positive or outside the amount domain
    /// * `LedgerError::InvalidMethod` - Method is not bank or upi
    pub async fn submit(
        &self,
        user_id: &str,
        submission: DepositSubmission,
    ) -> LedgerResult<PaymentRequest> {
        let amount = positive_amount(submission.amount)?;
        let payment_method: PaymentMethod = submission.payment_method.parse()?;

        let now = Utc::now();
        let request = PaymentRequest {
            id: new_request_id(),
            user_id: user_id.to_string(),
            amount,
            payment_method,
            transaction_ref: submission.transaction_ref,
            proof_url: submission.proof_url,
            notes: submission.notes,
            status: PaymentStatus::Pending,
            admin_notes: String::new(),
            created_at: now,
            updated_at: now,
        };

        let store = &self.store;
        let pending = &request;
        run_unit(&self.policy, "submit payment request", move || async move {
            let mut tx = store.begin().await?;
            tx.insert_payment_request(pending).await?;
            tx.commit().await?;
            Ok(())
        })
        .await?;

        info!(
            "Payment request {} submitted by {}: {} via {}",
            request.id, user_id, request.amount, request.payment_method
        );
        Ok(request)
    }

    /// Move a pending request to its terminal state
    ///
    /// On acceptance the user's wallet is credited in the same unit as the
    /// status change, so a request is never accepted without its credit.
    ///
    /// # Arguments
    ///
    /// * `admin` - Caller; must be an admin
    /// * `request_id` - Request to decide
    /// * `decision` - Accept or decline
    /// * `admin_notes` - Free text stored on the request
    ///
    /// # Errors
    ///
    /// * `LedgerError::Forbidden` - Caller is not an admin
    /// * `LedgerError::NotFound` - No such request
    /// * `LedgerError::AlreadyProcessed` - Request already left `pending`
    pub async fn process(
        &self,
        admin: &Principal,
        request_id: &str,
        decision: Decision,
        admin_notes: &str,
    ) -> LedgerResult<PaymentRequest> {
        admin.require_admin("processing payment requests")?;

        let store = &self.store;
        let currency = self.currency.as_str();
        let processed = run_unit(&self.policy, "process payment request", move || async move {
            let mut tx = store.begin().await?;

            let mut request = tx
                .lock_payment_request(request_id)
                .await?
                .ok_or_else(|| LedgerError::NotFound(format!("payment request {request_id}")))?;
            if request.status.is_terminal() {
                return Err(LedgerError::AlreadyProcessed(request_id.to_string()));
            }

            request.status = decision.status();
            request.admin_notes = admin_notes.to_string();
            request.updated_at = Utc::now();
            tx.update_payment_request(&request).await?;

            if decision == Decision::Accepted {
                credit_in(
                    &mut tx,
                    &request.user_id,
                    currency,
                    request.amount,
                    &format!("Payment request {request_id} accepted"),
                    EntryCategory::Deposit,
                )
                .await?;
            }

            tx.commit().await?;
            Ok(request)
        })
        .await?;

        info!(
            "Payment request {} {} by {} ({} for {})",
            processed.id, processed.status, admin.user_id, processed.amount, processed.user_id
        );
        Ok(processed)
    }

    /// Requests visible to the caller, newest first
    ///
    /// Admins see every user's requests; everyone else sees their own.
    pub async fn list(
        &self,
        principal: &Principal,
        status: Option<PaymentStatus>,
    ) -> LedgerResult<Vec<PaymentRequest>> {
        let filter = PaymentRequestFilter {
            user_id: (!principal.is_admin()).then(|| principal.user_id.clone()),
            status,
        };
        Ok(self.store.payment_requests(&filter).await?)
    }

    /// One request, if the caller may see it
    ///
    /// # Errors
    ///
    /// * `LedgerError::NotFound` - No such request, or it belongs to someone
    ///   else and the caller is not an admin
    pub async fn get(&self, principal: &Principal, request_id: &str) -> LedgerResult<PaymentRequest> {
        self.store
            .payment_request(request_id)
            .await?
            .filter(|r| principal.is_admin() || r.user_id == principal.user_id)
            .ok_or_else(|| LedgerError::NotFound(format!("payment request {request_id}")))
    }

    /// Deposit account details, falling back to the built-in defaults
    pub async fn payment_details(&self) -> LedgerResult<PaymentDetails> {
        Ok(self.store.payment_details().await?.unwrap_or_default())
    }

    /// Replace the deposit account details
    ///
    /// # Errors
    ///
    /// * `LedgerError::Forbidden` - Caller is not an admin
    pub async fn update_payment_details(
        &self,
        admin: &Principal,
        details: PaymentDetails,
    ) -> LedgerResult<PaymentDetails> {
        admin.require_admin("updating payment details")?;
        self.store.put_payment_details(&details).await?;
        info!("Payment details updated by {}", admin.user_id);
        self.payment_details().await
    }
}
