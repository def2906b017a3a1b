use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::domain::MonthBucket;

pub mod migrator;
pub mod repositories;

pub use repositories::review::{NewReview, ReviewRecord};
pub use repositories::user::{NewUser, Person, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn review_repo(&self) -> repositories::review::ReviewRepository {
        repositories::review::ReviewRepository::new(self.conn.clone())
    }

    pub async fn get_user_by_reg_number(&self, reg_number: &str) -> Result<Option<User>> {
        self.user_repo().get_by_reg_number(reg_number).await
    }

    pub async fn get_user_with_password(&self, reg_number: &str) -> Result<Option<(User, String)>> {
        self.user_repo()
            .get_by_reg_number_with_password(reg_number)
            .await
    }

    pub async fn get_user_by_email_or_reg_number(
        &self,
        email: &str,
        reg_number: &str,
    ) -> Result<Option<User>> {
        self.user_repo()
            .get_by_email_or_reg_number(email, reg_number)
            .await
    }

    pub async fn create_user(&self, new_user: NewUser) -> std::result::Result<User, DbErr> {
        self.user_repo().create(new_user).await
    }

    pub async fn list_people(&self, exclude_reg_number: Option<&str>) -> Result<Vec<Person>> {
        self.user_repo().list_people(exclude_reg_number).await
    }

    pub async fn add_review(&self, review: NewReview) -> Result<i32> {
        self.review_repo().insert(review).await
    }

    pub async fn get_reviews_for_subject(
        &self,
        subject_reg_number: &str,
        bucket: &MonthBucket,
    ) -> Result<Vec<ReviewRecord>> {
        self.review_repo()
            .for_subject(subject_reg_number, bucket)
            .await
    }

    pub async fn purge_reviews_outside(&self, current: &MonthBucket) -> Result<u64> {
        self.review_repo().delete_outside_bucket(current).await
    }
}
