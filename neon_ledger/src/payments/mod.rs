//! Deposit requests.
//!
//! A request is created `pending` and moves exactly once to `accepted` or
//! `declined` by an admin. Only acceptance credits the wallet, in the same
//! unit as the status change.

pub mod manager;
pub mod models;

pub use manager::PaymentManager;
pub use models::{
    Decision, DepositSubmission, PaymentDetails, PaymentMethod, PaymentRequest,
    PaymentRequestFilter, PaymentStatus, new_request_id,
};
