use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request},
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

pub mod auth;
mod error;
mod reviews;
mod system;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use crate::services::{AuthService, ReviewService, TokenService};

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.shared.tokens
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn review_service(&self) -> &Arc<dyn ReviewService> {
        &self.shared.review_service
    }
}

#[must_use]
pub fn create_app_state(shared: Arc<SharedState>) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
    })
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/health", get(system::health))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/", get(system::root))
        .nest("/api", api_router)
        .fallback(system::fallback)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
}

/// `user_id` is filled in by [`auth::auth_middleware`] once a token verifies.
fn request_span(request: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        user_id = tracing::field::Empty,
    )
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route("/reviews/people", get(reviews::list_people))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
