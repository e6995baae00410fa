//! Login: exchange an email and password for a bearer token

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::result::{Error, Result};
use crate::ports::UserStore;
use crate::services::user::verify_password;
use crate::services::TokenService;

pub struct AuthenticationService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
}

impl AuthenticationService {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    /// Token with subject = email and ownerId = user id
    ///
    /// Unknown email and wrong password fail the same way.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<String> {
        let user = self
            .users
            .find_user_by_email(email)?
            .filter(|user| verify_password(password, &user.password_hash));

        let Some(user) = user else {
            debug!("login rejected");
            return Err(Error::unauthenticated("invalid email or password"));
        };

        let token = self.tokens.issue(&user.email, &user.id)?;
        info!(user = %user.id, "token issued");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::token::claim;
    use crate::domain::{Address, NewUser};
    use crate::services::UserService;

    fn setup() -> (AuthenticationService, Arc<TokenService>, String) {
        let store = Arc::new(InMemoryStore::new());
        let tokens = Arc::new(TokenService::new(b"auth-test".to_vec()).unwrap());
        let user = UserService::new(store.clone())
            .create_user(&NewUser {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                phone_number: "+447700900123".to_string(),
                address: Address::new("1 High Street", "Leeds", "West Yorkshire", "LS1 1AA"),
                password: "correct horse".to_string(),
            })
            .unwrap();
        (
            AuthenticationService::new(store, Arc::clone(&tokens)),
            tokens,
            user.id,
        )
    }

    #[test]
    fn test_login_issues_token_for_user() {
        let (auth, tokens, user_id) = setup();
        let token = auth.authenticate("ADA@example.com", "correct horse").unwrap();

        assert!(tokens.validate(&token));
        assert_eq!(TokenService::extract_claim(&token, claim::OWNER_ID), Some(user_id));
        assert_eq!(
            TokenService::extract_claim(&token, claim::SUBJECT).as_deref(),
            Some("ada@example.com")
        );
    }

    #[test]
    fn test_bad_credentials_are_unauthenticated() {
        let (auth, _, _) = setup();
        assert!(matches!(
            auth.authenticate("ada@example.com", "wrong"),
            Err(Error::Unauthenticated(_))
        ));
        assert!(matches!(
            auth.authenticate("nobody@example.com", "correct horse"),
            Err(Error::Unauthenticated(_))
        ));
    }
}
