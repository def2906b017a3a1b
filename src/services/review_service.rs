//! Domain service for monthly peer reviews.

use thiserror::Error;

use crate::db::{NewReview, Person, ReviewRecord};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Reviewer or subject not found")]
    UnknownMember,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for ReviewError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for ReviewError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

#[async_trait::async_trait]
pub trait ReviewService: Send + Sync {
    /// Stores a review in the current month bucket and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::UnknownMember`] if either party is not registered,
    /// and [`ReviewError::Validation`] for an out-of-range rating or empty content.
    async fn create_review(&self, review: NewReview) -> Result<i32, ReviewError>;

    /// Reviews about `subject_reg_number` in the current month only.
    async fn reviews_for_subject(
        &self,
        subject_reg_number: &str,
    ) -> Result<Vec<ReviewRecord>, ReviewError>;

    /// Member directory, optionally leaving out one registration number.
    async fn list_people(
        &self,
        exclude_reg_number: Option<&str>,
    ) -> Result<Vec<Person>, ReviewError>;

    /// Deletes every review outside the current month bucket.
    async fn purge_stale(&self) -> Result<u64, ReviewError>;
}
