//! User domain model

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ids::{has_opaque_format, new_opaque_id, USER_PREFIX};
use super::result::{Error, Result};

/// E.164: `+`, a non-zero country digit, then up to 14 more digits
static PHONE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{1,14}$").unwrap());

pub fn is_valid_phone_number(phone_number: &str) -> bool {
    PHONE_NUMBER_RE.is_match(phone_number)
}

/// Postal address
///
/// `line1`, `town`, `county` and `postcode` are required; the other lines
/// are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line3: Option<String>,
    pub town: String,
    pub county: String,
    pub postcode: String,
}

impl Address {
    pub fn new(
        line1: impl Into<String>,
        town: impl Into<String>,
        county: impl Into<String>,
        postcode: impl Into<String>,
    ) -> Self {
        Self {
            line1: line1.into(),
            line2: None,
            line3: None,
            town: town.into(),
            county: county.into(),
            postcode: postcode.into(),
        }
    }

    pub fn with_lines(mut self, line2: Option<String>, line3: Option<String>) -> Self {
        self.line2 = line2;
        self.line3 = line3;
        self
    }

    /// Trimmed copy; blank optional lines become `None`
    pub fn normalized(&self) -> Self {
        let optional = |line: &Option<String>| {
            line.as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
        };
        Self {
            line1: self.line1.trim().to_string(),
            line2: optional(&self.line2),
            line3: optional(&self.line3),
            town: self.town.trim().to_string(),
            county: self.county.trim().to_string(),
            postcode: self.postcode.trim().to_uppercase(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("line1", &self.line1),
            ("town", &self.town),
            ("county", &self.county),
            ("postcode", &self.postcode),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(format!("address.{} cannot be empty", field)));
            }
        }
        Ok(())
    }
}

/// Registration details as submitted
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub address: Address,
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone_number", &self.phone_number)
            .field("address", &self.address)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl NewUser {
    /// Field checks, first failure wins
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name cannot be empty"));
        }
        let email = User::normalize_email(&self.email);
        if !looks_like_email(&email) {
            return Err(Error::validation(format!("{:?} is not an email address", email)));
        }
        if !is_valid_phone_number(self.phone_number.trim()) {
            return Err(Error::validation(format!(
                "phone number {:?} is not in E.164 form (+441234567890)",
                self.phone_number
            )));
        }
        self.address.validate()?;
        if self.password.is_empty() {
            return Err(Error::validation("password cannot be empty"));
        }
        Ok(())
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}

/// A registered customer
///
/// `password_hash` is an Argon2id PHC string and is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub address: Address,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a user from registration details and an already computed hash
    pub fn new(details: &NewUser, password_hash: impl Into<String>) -> Self {
        let now = super::now();
        Self {
            id: new_opaque_id(USER_PREFIX),
            name: details.name.trim().to_string(),
            email: Self::normalize_email(&details.email),
            phone_number: details.phone_number.trim().to_string(),
            address: details.address.normalized(),
            password_hash: password_hash.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Emails compare case-insensitively
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    pub fn is_valid_id(id: &str) -> bool {
        has_opaque_format(USER_PREFIX, id)
    }
}
