use axum::{
    Json,
    extract::{Request, State, rejection::JsonRejection},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{
    normalize_optional, validate_email, validate_password, validate_required,
};
use super::{ApiError, ApiResponse, AppState};
use crate::services::{SignupRequest, TokenError, TokenGrant};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupPayload {
    pub name: String,
    pub reg_number: String,
    pub mobile: String,
    #[serde(rename = "vitEmail")]
    pub email: String,
    pub personal_email: String,
    pub team_number: String,
    pub codename: String,
    pub password: String,
    pub residence_type: String,
    #[serde(default)]
    pub hostel_type: Option<String>,
    #[serde(default)]
    pub block_room: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    pub reg_number: String,
    pub password: String,
}

impl SignupPayload {
    fn into_request(self, min_password_length: usize) -> Result<SignupRequest, ApiError> {
        validate_password(&self.password, min_password_length)?;

        Ok(SignupRequest {
            name: validate_required("Name", &self.name)?.to_string(),
            reg_number: validate_required("Registration number", &self.reg_number)?.to_string(),
            mobile: validate_required("Mobile", &self.mobile)?.to_string(),
            email: validate_email("Email", &self.email)?.to_string(),
            personal_email: validate_email("Personal email", &self.personal_email)?.to_string(),
            team_number: validate_required("Team number", &self.team_number)?.to_string(),
            codename: validate_required("Codename", &self.codename)?.to_string(),
            residence_type: validate_required("Residence type", &self.residence_type)?
                .to_string(),
            hostel_type: normalize_optional(self.hostel_type),
            block_room: normalize_optional(self.block_room),
            password: self.password,
        })
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Requires `Authorization: Bearer <token>`. Verified claims are placed in
/// the request extensions as [`crate::services::TokenClaims`].
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_bearer(&headers) else {
        return Err(ApiError::unauthorized("Missing bearer token"));
    };

    let claims = state.tokens().validate(token).map_err(|e| match e {
        TokenError::Expired => ApiError::unauthorized("Token expired"),
        _ => ApiError::unauthorized("Invalid token"),
    })?;

    if let Some(reg_number) = claims.get("reg_number") {
        tracing::Span::current().record("user_id", reg_number);
    }

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/signup
/// Register a member and return a bearer token
pub async fn signup(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignupPayload>, JsonRejection>,
) -> Result<Json<ApiResponse<TokenGrant>>, ApiError> {
    let Json(payload) = payload?;
    let request = payload.into_request(state.config().auth.min_password_length)?;
    let grant = state.auth_service().signup(request).await?;
    Ok(Json(ApiResponse::success(grant)))
}

/// POST /auth/login
/// Authenticate with registration number and password
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<Json<ApiResponse<TokenGrant>>, ApiError> {
    let Json(payload) = payload?;
    let reg_number = validate_required("Registration number", &payload.reg_number)?;
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let grant = state
        .auth_service()
        .login(reg_number, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(grant)))
}
