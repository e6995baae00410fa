//! Authorization gate
//!
//! Every protected operation passes through three checks, in this order:
//! the bearer token must be present and valid, it must carry both identity
//! claims, and the caller must own the resource. The first failing check
//! decides the outcome.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::result::{Error, Result};
use crate::domain::Identity;
use crate::services::TokenService;

pub const BEARER_PREFIX: &str = "Bearer ";

/// Outcome of running a request through the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Unauthenticated,
    IdentityIncomplete,
    Forbidden,
    Allowed,
}

impl GateDecision {
    /// Decision carried by a gate result
    ///
    /// `None` for failures that are not gate outcomes, such as a store error
    /// while resolving the resource owner.
    pub fn of<T>(result: &Result<T>) -> Option<Self> {
        match result {
            Ok(_) => Some(Self::Allowed),
            Err(Error::Unauthenticated(_)) => Some(Self::Unauthenticated),
            Err(Error::IdentityIncomplete(_)) => Some(Self::IdentityIncomplete),
            Err(Error::Forbidden(_)) => Some(Self::Forbidden),
            Err(_) => None,
        }
    }
}

pub struct AuthGate {
    tokens: Arc<TokenService>,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }

    /// The token part of an `Authorization` header value
    pub fn bearer_token(header: Option<&str>) -> Option<&str> {
        let token = header?.strip_prefix(BEARER_PREFIX)?.trim();
        (!token.is_empty()).then_some(token)
    }

    /// Resolve the caller identity from an `Authorization` header value
    pub fn authenticate(&self, header: Option<&str>) -> Result<Identity> {
        self.authenticate_at(header, Utc::now())
    }

    pub fn authenticate_at(&self, header: Option<&str>, now: DateTime<Utc>) -> Result<Identity> {
        let Some(token) = Self::bearer_token(header) else {
            debug!(decision = ?GateDecision::Unauthenticated, "no bearer token");
            return Err(Error::unauthenticated("missing bearer token"));
        };

        let Some(claims) = self.tokens.verify_at(token, now) else {
            debug!(decision = ?GateDecision::Unauthenticated, "token rejected");
            return Err(Error::unauthenticated("invalid or expired token"));
        };

        match claims.identity() {
            Some(identity) => Ok(identity),
            None => {
                debug!(decision = ?GateDecision::IdentityIncomplete, "token lacks identity claims");
                Err(Error::IdentityIncomplete(
                    "token missing required claims".to_string(),
                ))
            }
        }
    }

    /// Full gate: authenticate, then require ownership of `resource_owner`
    pub fn check(&self, header: Option<&str>, resource_owner: &str) -> Result<Identity> {
        let identity = self.authenticate(header)?;
        authorize(&identity, resource_owner)?;
        Ok(identity)
    }
}

/// Ownership check for an already authenticated caller
pub fn authorize(identity: &Identity, resource_owner: &str) -> Result<()> {
    if identity.owner_id != resource_owner {
        debug!(
            decision = ?GateDecision::Forbidden,
            caller = %identity.owner_id,
            "caller does not own resource"
        );
        return Err(Error::forbidden(format!(
            "{} may not access this resource",
            identity.owner_id
        )));
    }
    debug!(decision = ?GateDecision::Allowed, caller = %identity.owner_id);
    Ok(())
}
