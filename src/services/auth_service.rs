//! Domain service for member signup and login.
//!
//! Both operations end by minting a bearer token; neither keeps session state.

use serde::Serialize;
use thiserror::Error;

use crate::services::token::TokenError;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid registration number or password")]
    InvalidCredentials,

    #[error("User with this email or registration number already exists")]
    DuplicateUser,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Credential task failed: {err}"))
    }
}

/// Everything a member supplies at signup. `password` is plaintext and is
/// hashed before it reaches the store.
#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub name: String,
    pub reg_number: String,
    pub mobile: String,
    pub email: String,
    pub personal_email: String,
    pub team_number: String,
    pub codename: String,
    pub password: String,
    pub residence_type: String,
    pub hostel_type: Option<String>,
    pub block_room: Option<String>,
}

/// Token handed back after signup or login. `token` mirrors `access_token`
/// for clients that read either field.
#[derive(Debug, Clone, Serialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: String,
    pub token: String,
}

impl TokenGrant {
    #[must_use]
    pub fn bearer(token: String) -> Self {
        Self {
            access_token: token.clone(),
            token_type: "bearer".to_string(),
            token,
        }
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Registers a member and returns a token whose `sub` is their email.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DuplicateUser`] if the email or registration
    /// number is already taken.
    async fn signup(&self, request: SignupRequest) -> Result<TokenGrant, AuthError>;

    /// Verifies credentials and returns a token whose `sub` is the
    /// registration number.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown registration
    /// number and for a wrong password alike.
    async fn login(&self, reg_number: &str, password: &str) -> Result<TokenGrant, AuthError>;
}
