//! User service - registration and profile reads
//!
//! Passwords are stored only as Argon2id PHC strings.

use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::info;

use crate::domain::result::{Error, Result};
use crate::domain::{Identity, NewUser, User};
use crate::ports::UserStore;
use crate::services::gate::authorize;

pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub fn create_user(&self, details: &NewUser) -> Result<User> {
        details.validate()?;

        let user = User::new(details, hash_password(&details.password)?);
        let user = self.store.insert_user(&user)?;
        info!(user = %user.id, "user registered");
        Ok(user)
    }

    /// Owner-only profile read
    pub fn fetch_user(&self, user_id: &str, caller: &Identity) -> Result<User> {
        if !User::is_valid_id(user_id) {
            return Err(Error::validation(format!(
                "user id {} is not a usr- identifier",
                user_id
            )));
        }
        let user = self
            .store
            .find_user_by_id(user_id)?
            .ok_or_else(|| Error::not_found(format!("user {}", user_id)))?;
        authorize(caller, &user.id)?;
        Ok(user)
    }
}

/// Hash a password into a PHC string with a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::store(format!("password hashing failed: {}", e)))
}

/// True if `password` matches the stored PHC string
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::Address;

    fn service() -> UserService {
        UserService::new(Arc::new(InMemoryStore::new()))
    }

    fn details(name: &str, email: &str, password: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            phone_number: "+447700900123".to_string(),
            address: Address::new("1 High Street", "Leeds", "West Yorkshire", "LS1 1AA"),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not a phc string"));
    }

    #[test]
    fn test_create_user_normalizes_and_hashes() {
        let user = service()
            .create_user(&details(" Ada ", " Ada@Example.com ", "secret"))
            .unwrap();
        assert!(User::is_valid_id(&user.id));
        assert_eq!(user.name, "Ada");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.phone_number, "+447700900123");
        assert_eq!(user.address.town, "Leeds");
        assert_ne!(user.password_hash, "secret");
    }

    #[test]
    fn test_create_user_rejects_bad_input() {
        let service = service();
        assert!(service.create_user(&details("", "a@b.com", "pw")).is_err());
        assert!(service.create_user(&details("A", "not-an-email", "pw")).is_err());
        assert!(service.create_user(&details("A", "a@b.com", "")).is_err());

        let mut no_phone = details("A", "a@b.com", "pw");
        no_phone.phone_number = "0113 496 0000".to_string();
        assert!(matches!(service.create_user(&no_phone), Err(Error::Validation(_))));

        let mut no_postcode = details("A", "a@b.com", "pw");
        no_postcode.address.postcode = String::new();
        assert!(matches!(service.create_user(&no_postcode), Err(Error::Validation(_))));

        service.create_user(&details("A", "a@b.com", "pw")).unwrap();
        assert!(matches!(
            service.create_user(&details("B", "A@B.com", "pw")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_fetch_user_is_owner_only() {
        let service = service();
        let user = service
            .create_user(&details("Ada", "ada@example.com", "pw"))
            .unwrap();
        let me = Identity {
            subject: user.email.clone(),
            owner_id: user.id.clone(),
        };
        let other = Identity {
            subject: "bob@example.com".to_string(),
            owner_id: "usr-other".to_string(),
        };

        let fetched = service.fetch_user(&user.id, &me).unwrap();
        assert_eq!(fetched.id, user.id);
        assert_eq!(fetched.address, user.address);
        assert!(matches!(service.fetch_user(&user.id, &other), Err(Error::Forbidden(_))));
        assert!(matches!(service.fetch_user("usr-nobody", &me), Err(Error::NotFound(_))));
    }
}
