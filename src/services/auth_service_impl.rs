//! `SeaORM` implementation of the `AuthService` trait.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::SqlErr;
use tokio::task;
use tracing::{debug, info};

use crate::db::{NewUser, Store};
use crate::services::auth_service::{AuthError, AuthService, SignupRequest, TokenGrant};
use crate::services::password::CredentialHasher;
use crate::services::token::TokenService;

/// Verified against when the registration number is unknown, so a miss
/// costs the same key derivation as a wrong password.
const DUMMY_PASSWORD: &str = "peerly-unknown-member";

pub struct SeaOrmAuthService {
    store: Store,
    hasher: CredentialHasher,
    tokens: Arc<TokenService>,
    min_password_length: usize,
    dummy_credential: Arc<str>,
}

impl SeaOrmAuthService {
    /// Derives the dummy credential up front; this runs one full KDF.
    #[must_use]
    pub fn new(
        store: Store,
        hasher: CredentialHasher,
        tokens: Arc<TokenService>,
        min_password_length: usize,
    ) -> Self {
        Self {
            dummy_credential: hasher.hash(DUMMY_PASSWORD).into(),
            store,
            hasher,
            tokens,
            min_password_length,
        }
    }

    fn grant(&self, subject: &str, reg_number: &str) -> Result<TokenGrant, AuthError> {
        let claims = BTreeMap::from([
            ("sub".to_string(), subject.to_string()),
            ("reg_number".to_string(), reg_number.to_string()),
        ]);
        let token = self.tokens.issue(claims, self.tokens.ttl_minutes())?;
        Ok(TokenGrant::bearer(token))
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn signup(&self, request: SignupRequest) -> Result<TokenGrant, AuthError> {
        if request.password.chars().count() < self.min_password_length {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }

        if self
            .store
            .get_user_by_email_or_reg_number(&request.email, &request.reg_number)
            .await?
            .is_some()
        {
            return Err(AuthError::DuplicateUser);
        }

        let hasher = self.hasher;
        let password = request.password;
        let password_hash = task::spawn_blocking(move || hasher.hash(&password)).await?;

        let new_user = NewUser {
            name: request.name,
            reg_number: request.reg_number,
            mobile: request.mobile,
            email: request.email,
            personal_email: request.personal_email,
            team_number: request.team_number,
            codename: request.codename,
            password_hash,
            residence_type: request.residence_type,
            hostel_type: request.hostel_type,
            block_room: request.block_room,
        };

        // A concurrent signup can pass the lookup above; the unique index
        // on reg_number catches it here.
        let user = self.store.create_user(new_user).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AuthError::DuplicateUser
            } else {
                AuthError::from(e)
            }
        })?;

        info!(reg_number = %user.reg_number, "Registered new member");
        self.grant(&user.email, &user.reg_number)
    }

    async fn login(&self, reg_number: &str, password: &str) -> Result<TokenGrant, AuthError> {
        let (user, stored) = match self.store.get_user_with_password(reg_number).await? {
            Some((user, stored)) => (Some(user), Arc::from(stored)),
            None => {
                debug!("Login for unknown registration number");
                (None, Arc::clone(&self.dummy_credential))
            }
        };

        let hasher = self.hasher;
        let plaintext = password.to_string();
        let valid = task::spawn_blocking(move || hasher.verify(&plaintext, &stored)).await?;

        match user {
            Some(user) if valid => self.grant(reg_number, &user.reg_number),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service(iterations: u32) -> SeaOrmAuthService {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let tokens = Arc::new(TokenService::new("unit-test-secret", "HS256", 60).unwrap());
        SeaOrmAuthService::new(store, CredentialHasher::new(iterations), tokens, 8)
    }

    #[test]
    fn dummy_password_meets_length_floor() {
        assert!(DUMMY_PASSWORD.len() >= 8);
    }

    #[tokio::test]
    async fn dummy_credential_uses_configured_cost() {
        let service = service(1_234).await;
        assert!(service.dummy_credential.starts_with("pbkdf2_sha256$1234$"));
        assert!(service.hasher.verify(DUMMY_PASSWORD, &service.dummy_credential));
    }

    #[tokio::test]
    async fn unknown_member_is_rejected_even_with_dummy_password() {
        let service = service(1_000).await;

        let err = service.login("21BCE9999", DUMMY_PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = service.login("21BCE9999", "whatever123").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }
}
