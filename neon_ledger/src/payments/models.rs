//! Payment request data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::LedgerError;
use crate::wallet::{Amount, UserId};

/// Deposit channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Bank,
    Upi,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Bank => write!(f, "bank"),
            PaymentMethod::Upi => write!(f, "upi"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank" => Ok(PaymentMethod::Bank),
            "upi" => Ok(PaymentMethod::Upi),
            other => Err(LedgerError::InvalidMethod(other.to_string())),
        }
    }
}

/// Request lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Accepted,
    Declined,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Accepted => write!(f, "accepted"),
            PaymentStatus::Declined => write!(f, "declined"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "accepted" => Ok(PaymentStatus::Accepted),
            "declined" => Ok(PaymentStatus::Declined),
            other => Err(LedgerError::InvalidDecision(other.to_string())),
        }
    }
}

/// Admin decision on a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accepted,
    Declined,
}

impl Decision {
    pub fn status(&self) -> PaymentStatus {
        match self {
            Decision::Accepted => PaymentStatus::Accepted,
            Decision::Declined => PaymentStatus::Declined,
        }
    }
}

impl FromStr for Decision {
    type Err = LedgerError;

    /// Accepts both the status names and the admin route actions.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" | "approve" => Ok(Decision::Accepted),
            "declined" | "decline" => Ok(Decision::Declined),
            other => Err(LedgerError::InvalidDecision(other.to_string())),
        }
    }
}

/// Deposit request model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub id: String,
    pub user_id: UserId,
    pub amount: Amount,
    pub payment_method: PaymentMethod,
    /// Reference of the external transfer, as typed by the user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: PaymentStatus,
    pub admin_notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generate a unique, time-ordered request id
pub fn new_request_id() -> String {
    format!("req_{}", Uuid::now_v7().simple())
}

/// Submission payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositSubmission {
    pub amount: Amount,
    pub payment_method: String,
    #[serde(default)]
    pub transaction_ref: Option<String>,
    #[serde(default)]
    pub proof_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Filter for request listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentRequestFilter {
    pub user_id: Option<UserId>,
    pub status: Option<PaymentStatus>,
}

impl PaymentRequestFilter {
    pub fn matches(&self, request: &PaymentRequest) -> bool {
        self.user_id.as_ref().is_none_or(|id| *id == request.user_id)
            && self.status.is_none_or(|s| s == request.status)
    }
}

/// Account details shown to users making a deposit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub bank_name: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub account_holder_name: String,
    pub upi_id: String,
    pub qr_code_url: String,
    pub updated_at: DateTime<Utc>,
}

impl Default for PaymentDetails {
    fn default() -> Self {
        Self {
            bank_name: "HDFC Bank".to_string(),
            account_number: "1234567890".to_string(),
            ifsc_code: "HDFC0001234".to_string(),
            account_holder_name: "NeonPlay Gaming Pvt Ltd".to_string(),
            upi_id: "neonplay@hdfc".to_string(),
            qr_code_url: "/payment-qr.png".to_string(),
            updated_at: Utc::now(),
        }
    }
}
