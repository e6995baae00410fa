//! Bearer token claims and the verified caller identity

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Claim names as they appear in the token payload
pub mod claim {
    pub const SUBJECT: &str = "sub";
    pub const OWNER_ID: &str = "ownerId";
    pub const ISSUED_AT: &str = "iat";
    pub const EXPIRES_AT: &str = "exp";
    pub const ISSUER: &str = "iss";
    pub const AUDIENCE: &str = "aud";
}

/// Token header; only HS256 is ever issued or accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Token payload
///
/// Identity claims are optional on the way in so that a token signed
/// without them can be told apart from a malformed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(rename = "ownerId", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Seconds since the Unix epoch
    pub iat: i64,
    /// Seconds since the Unix epoch
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    /// Expired once `now` has reached the expiry instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// The caller identity, if both identity claims are present and non-empty
    pub fn identity(&self) -> Option<Identity> {
        let subject = self.sub.as_deref().filter(|s| !s.trim().is_empty())?;
        let owner_id = self.owner_id.as_deref().filter(|s| !s.trim().is_empty())?;
        Some(Identity {
            subject: subject.to_string(),
            owner_id: owner_id.to_string(),
        })
    }
}

/// A caller whose token has been verified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub subject: String,
    pub owner_id: String,
}
