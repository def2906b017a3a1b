//! `SeaORM` implementation of the `ReviewService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{NewReview, Person, ReviewRecord, Store};
use crate::domain::MonthBucket;
use crate::services::review_service::{MAX_RATING, MIN_RATING, ReviewError, ReviewService};

pub struct SeaOrmReviewService {
    store: Store,
}

impl SeaOrmReviewService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ReviewService for SeaOrmReviewService {
    async fn create_review(&self, review: NewReview) -> Result<i32, ReviewError> {
        if !(MIN_RATING..=MAX_RATING).contains(&review.rating) {
            return Err(ReviewError::Validation(format!(
                "Rating must be between {MIN_RATING} and {MAX_RATING}"
            )));
        }

        if review.content.trim().is_empty() {
            return Err(ReviewError::Validation(
                "Review content cannot be empty".to_string(),
            ));
        }

        let reviewer = self
            .store
            .get_user_by_reg_number(&review.reviewer_reg_number)
            .await?;
        let subject = self
            .store
            .get_user_by_reg_number(&review.subject_reg_number)
            .await?;

        if reviewer.is_none() || subject.is_none() {
            return Err(ReviewError::UnknownMember);
        }

        let id = self.store.add_review(review).await?;
        Ok(id)
    }

    async fn reviews_for_subject(
        &self,
        subject_reg_number: &str,
    ) -> Result<Vec<ReviewRecord>, ReviewError> {
        let bucket = MonthBucket::current();
        let reviews = self
            .store
            .get_reviews_for_subject(subject_reg_number, &bucket)
            .await?;
        Ok(reviews)
    }

    async fn list_people(
        &self,
        exclude_reg_number: Option<&str>,
    ) -> Result<Vec<Person>, ReviewError> {
        Ok(self.store.list_people(exclude_reg_number).await?)
    }

    async fn purge_stale(&self) -> Result<u64, ReviewError> {
        let bucket = MonthBucket::current();
        let removed = self.store.purge_reviews_outside(&bucket).await?;
        info!(bucket = %bucket, removed, "Purged stale reviews");
        Ok(removed)
    }
}
