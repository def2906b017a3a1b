//! HMAC-signed bearer tokens.
//!
//! Tokens are stateless JWTs. A token is valid iff it parses, its signature
//! verifies with the process-wide secret, and `now <= exp`. There is no
//! leeway and no revocation list.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::config::AuthConfig;

const RESERVED_CLAIMS: &[&str] = &["exp", "iat"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token signing secret is not configured")]
    MissingSecret,

    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Token lifetime must be at least one minute")]
    InvalidTtl,

    #[error("Claim name '{0}' is reserved")]
    ReservedClaim(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,
}

/// Body of an issued token: caller claims plus issue and expiry times
/// (seconds since the Unix epoch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(flatten)]
    pub claims: BTreeMap<String, String>,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.claims.get(name).map(String::as_str)
    }
}

#[derive(Clone)]
pub struct TokenService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_minutes: u32,
}

impl TokenService {
    pub fn new(secret: &str, algorithm: &str, ttl_minutes: u32) -> Result<Self, TokenError> {
        if secret.trim().is_empty() {
            return Err(TokenError::MissingSecret);
        }

        if ttl_minutes == 0 {
            return Err(TokenError::InvalidTtl);
        }

        let algorithm = match algorithm {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => return Err(TokenError::UnsupportedAlgorithm(other.to_string())),
        };

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_minutes,
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, TokenError> {
        Self::new(
            &config.jwt_secret,
            &config.jwt_algorithm,
            config.token_ttl_minutes,
        )
    }

    /// Configured default lifetime for login/signup tokens.
    #[must_use]
    pub const fn ttl_minutes(&self) -> u32 {
        self.ttl_minutes
    }

    pub fn issue(
        &self,
        claims: BTreeMap<String, String>,
        ttl_minutes: u32,
    ) -> Result<String, TokenError> {
        self.issue_at(claims, ttl_minutes, Utc::now())
    }

    pub fn issue_at(
        &self,
        claims: BTreeMap<String, String>,
        ttl_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if ttl_minutes == 0 {
            return Err(TokenError::InvalidTtl);
        }

        if let Some(reserved) = claims
            .keys()
            .find(|k| RESERVED_CLAIMS.contains(&k.as_str()))
        {
            return Err(TokenError::ReservedClaim(reserved.clone()));
        }

        let body = TokenClaims {
            claims,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(i64::from(ttl_minutes))).timestamp(),
        };

        encode(&Header::new(self.algorithm), &body, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Validates against an explicit clock. Expiry is inclusive: a token is
    /// still accepted at exactly `exp` and rejected one second later.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        // Expiry is checked below against `now` so tests can fabricate time.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            TokenError::Invalid
        })?;

        if now.timestamp() > data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}
