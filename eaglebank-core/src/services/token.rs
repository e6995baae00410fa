//! Signed bearer tokens
//!
//! Tokens have the familiar three-part shape
//! `base64url(header).base64url(payload).base64url(tag)`, where the tag is
//! an HMAC-SHA256 over the first two parts keyed with a server secret.
//! There is no session table; everything needed to validate a token is in
//! the token and the secret.
//!
//! Nothing in here returns an error for bad caller input. A token that
//! cannot be decoded is simply not valid.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::domain::result::{Error, Result};
use crate::domain::token::{Claims, TokenHeader};

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of an issued token
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Length of a generated signing secret in bytes
pub const SECRET_LENGTH: usize = 32;

/// Issues and validates bearer tokens
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl: Duration,
    issuer: Option<String>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(Error::Config("token secret cannot be empty".to_string()));
        }
        Ok(Self {
            secret,
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
            issuer: None,
        })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh random signing secret
    pub fn generate_secret() -> Vec<u8> {
        let mut secret = vec![0u8; SECRET_LENGTH];
        rand::thread_rng().fill_bytes(&mut secret);
        secret
    }

    /// Issue a token for `subject` acting as `owner_id`, valid from now
    pub fn issue(&self, subject: &str, owner_id: &str) -> Result<String> {
        self.issue_at(subject, owner_id, Utc::now())
    }

    pub fn issue_at(&self, subject: &str, owner_id: &str, now: DateTime<Utc>) -> Result<String> {
        let expires = now.checked_add_signed(self.ttl).ok_or_else(|| {
            Error::Config(format!("token ttl {} overflows the expiry time", self.ttl))
        })?;
        let claims = Claims {
            sub: Some(subject.to_string()),
            owner_id: Some(owner_id.to_string()),
            iat: now.timestamp(),
            exp: expires.timestamp(),
            iss: self.issuer.clone(),
            aud: self.issuer.clone(),
        };
        self.encode(&claims)
    }

    /// Sign arbitrary claims
    ///
    /// Used directly only where a token without identity claims is needed.
    pub fn encode(&self, claims: &Claims) -> Result<String> {
        let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&TokenHeader::default())?);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
        let signing_input = format!("{}.{}", header, payload);

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, tag))
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| Error::Config(e.to_string()))
    }

    /// True if the token is well formed, correctly signed and unexpired
    pub fn validate(&self, token: &str) -> bool {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.verify_at(token, now).is_some()
    }

    /// Claims of a valid, unexpired token
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<Claims> {
        self.decode_verified(token)
            .filter(|claims| !claims.is_expired_at(now))
    }

    /// Claims of a correctly signed token, expired or not
    pub fn decode_verified(&self, token: &str) -> Option<Claims> {
        let (header, payload, tag) = split(token)?;

        let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;
        let mut mac = self.mac().ok()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        // Constant-time comparison
        mac.verify_slice(&tag).ok()?;

        let header: TokenHeader = decode_part(header)?;
        if header != TokenHeader::default() {
            return None;
        }
        decode_part(payload)
    }

    /// Read one claim from a token's payload without checking its signature
    ///
    /// String claims come back as-is and numbers in decimal. Anything
    /// missing, null or undecodable is `None`.
    pub fn extract_claim(token: &str, name: &str) -> Option<String> {
        let (_, payload, _) = split(token)?;
        let payload: serde_json::Value = decode_part(payload)?;
        match payload.get(name)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

fn split(token: &str) -> Option<(&str, &str, &str)> {
    let mut parts = token.split('.');
    let header = parts.next().filter(|p| !p.is_empty())?;
    let payload = parts.next().filter(|p| !p.is_empty())?;
    let tag = parts.next().filter(|p| !p.is_empty())?;
    if parts.next().is_some() {
        return None;
    }
    Some((header, payload, tag))
}

fn decode_part<T: serde::de::DeserializeOwned>(part: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(part).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::token::claim;

    fn service() -> TokenService {
        TokenService::new(b"test-secret-of-reasonable-length".to_vec()).unwrap()
    }

    fn tamper_payload(token: &str, owner: &str) -> String {
        let parts: Vec<&str> = token.split('.').collect();
        let mut payload: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        payload["ownerId"] = serde_json::json!(owner);
        let forged = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());
        format!("{}.{}.{}", parts[0], forged, parts[2])
    }

    #[test]
    fn test_issue_then_extract_round_trip() {
        let tokens = service();
        let token = tokens.issue("ada@example.com", "usr-1").unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert!(tokens.validate(&token));
        assert_eq!(
            TokenService::extract_claim(&token, claim::OWNER_ID).as_deref(),
            Some("usr-1")
        );
        assert_eq!(
            TokenService::extract_claim(&token, claim::SUBJECT).as_deref(),
            Some("ada@example.com")
        );
    }

    #[test]
    fn test_numeric_claims_extract_as_decimal_strings() {
        let tokens = service();
        let now = Utc::now();
        let token = tokens.issue_at("a", "usr-1", now).unwrap();
        assert_eq!(
            TokenService::extract_claim(&token, claim::ISSUED_AT),
            Some(now.timestamp().to_string())
        );
        assert!(TokenService::extract_claim(&token, "missing").is_none());
    }

    #[test]
    fn test_expiry() {
        let tokens = service().with_ttl(Duration::hours(1));
        let issued = Utc::now();
        let token = tokens.issue_at("a", "usr-1", issued).unwrap();

        assert!(tokens.validate_at(&token, issued + Duration::minutes(59)));
        assert!(!tokens.validate_at(&token, issued + Duration::hours(1)));
        assert!(!tokens.validate_at(&token, issued + Duration::days(2)));
        // Still decodes once expired, it just is not valid
        assert!(tokens.decode_verified(&token).is_some());
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let tokens = service();
        let token = tokens.issue("a", "usr-1").unwrap();
        let forged = tamper_payload(&token, "usr-2");

        assert!(!tokens.validate(&forged));
        // The unverified read still sees the forged value
        assert_eq!(
            TokenService::extract_claim(&forged, claim::OWNER_ID).as_deref(),
            Some("usr-2")
        );
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let token = service().issue("a", "usr-1").unwrap();
        let other = TokenService::new(TokenService::generate_secret()).unwrap();
        assert!(!other.validate(&token));
    }

    #[test]
    fn test_malformed_tokens_are_invalid_not_errors() {
        let tokens = service();
        for bad in ["", "abc", "a.b", "a.b.c", "a..c", "a.b.c.d", "!!!.???.***"] {
            assert!(!tokens.validate(bad), "{:?} should be invalid", bad);
            assert!(TokenService::extract_claim(bad, claim::OWNER_ID).is_none());
        }
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(TokenService::new(Vec::new()), Err(Error::Config(_))));
    }

    #[test]
    fn test_issuer_is_embedded() {
        let tokens = service().with_issuer("eaglebank");
        let token = tokens.issue("a", "usr-1").unwrap();
        assert_eq!(
            TokenService::extract_claim(&token, claim::ISSUER).as_deref(),
            Some("eaglebank")
        );
    }

    #[test]
    fn test_expiry_overflow_is_a_config_error() {
        let tokens = service().with_ttl(Duration::days(365_000_000));
        let result = tokens.issue_at("a", "usr-1", Utc::now());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
