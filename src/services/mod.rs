pub mod password;
pub use password::CredentialHasher;

pub mod token;
pub use token::{TokenClaims, TokenError, TokenService};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, SignupRequest, TokenGrant};
pub use auth_service_impl::SeaOrmAuthService;

pub mod review_service;
pub mod review_service_impl;
pub use review_service::{ReviewError, ReviewService};
pub use review_service_impl::SeaOrmReviewService;
