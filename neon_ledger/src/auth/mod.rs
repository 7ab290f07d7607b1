//! Caller identity.
//!
//! Token verification happens at the API edge; the ledger only sees the
//! resulting [`Principal`], passed explicitly to every operation whose
//! outcome depends on who is asking.

pub mod models;

pub use models::{AccessTokenClaims, Principal, Role};
