//! Authentication data models.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::LedgerError;
use crate::wallet::UserId;

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Authenticated caller, produced by token verification at the API edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn user(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::User,
        }
    }

    pub fn admin(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with `Forbidden` unless this principal is an admin
    pub fn require_admin(&self, action: &str) -> Result<(), LedgerError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(LedgerError::Forbidden(format!(
                "{action} requires an admin (caller {})",
                self.user_id
            )))
        }
    }
}

/// JWT claims for access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: UserId,
    #[serde(default = "default_role")]
    pub role: Role,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

fn default_role() -> Role {
    Role::User
}

impl From<AccessTokenClaims> for Principal {
    fn from(claims: AccessTokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_admin() {
        assert!(Principal::admin("ops").require_admin("approve").is_ok());
        let err = Principal::user("u1").require_admin("approve").unwrap_err();
        assert_eq!(err.kind(), "forbidden");
    }

    #[test]
    fn test_claims_without_role_default_to_user() {
        let claims: AccessTokenClaims =
            serde_json::from_str(r#"{"sub":"u1","exp":4102444800}"#).unwrap();
        let principal = Principal::from(claims);
        assert_eq!(principal, Principal::user("u1"));
    }
}
