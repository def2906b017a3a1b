use std::sync::Arc;

use anyhow::Context;

use crate::config::Config;
use crate::db::Store;
use crate::scheduler::{PurgeScheduler, ReviewPurger};
use crate::services::{
    AuthService, CredentialHasher, ReviewService, SeaOrmAuthService, SeaOrmReviewService,
    TokenService,
};

/// Process-wide services, built once at startup. Configuration is read-only
/// after this point.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub tokens: Arc<TokenService>,

    pub auth_service: Arc<dyn AuthService>,

    pub review_service: Arc<dyn ReviewService>,

    pub purge_scheduler: Arc<PurgeScheduler>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let tokens = Arc::new(
            TokenService::from_config(&config.auth).context("Invalid token configuration")?,
        );
        let hasher = CredentialHasher::new(config.auth.pbkdf2_iterations);

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            hasher,
            tokens.clone(),
            config.auth.min_password_length,
        )) as Arc<dyn AuthService>;

        let review_service =
            Arc::new(SeaOrmReviewService::new(store.clone())) as Arc<dyn ReviewService>;

        let purger = Arc::new(store.clone()) as Arc<dyn ReviewPurger>;
        let purge_scheduler = Arc::new(PurgeScheduler::new(purger, &config.scheduler));

        Ok(Self {
            config: Arc::new(config),
            store,
            tokens,
            auth_service,
            review_service,
            purge_scheduler,
        })
    }
}
