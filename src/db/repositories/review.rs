use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::MonthBucket;
use crate::entities::{prelude::*, reviews};

pub use crate::entities::reviews::Model as ReviewRecord;

#[derive(Debug, Clone)]
pub struct NewReview {
    pub reviewer_reg_number: String,
    pub subject_reg_number: String,
    pub content: String,
    pub rating: i32,
}

pub struct ReviewRepository {
    conn: DatabaseConnection,
}

impl ReviewRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Stores a review stamped with the bucket of its own `created_at`.
    pub async fn insert(&self, review: NewReview) -> Result<i32> {
        let now = chrono::Utc::now();
        self.insert_at(review, now).await
    }

    pub async fn insert_at(
        &self,
        review: NewReview,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<i32> {
        let active = reviews::ActiveModel {
            reviewer_reg_number: Set(review.reviewer_reg_number),
            subject_reg_number: Set(review.subject_reg_number),
            content: Set(review.content),
            rating: Set(review.rating),
            month_year: Set(MonthBucket::from_timestamp(created_at).into()),
            created_at: Set(created_at.to_rfc3339()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert review")?;

        Ok(model.id)
    }

    pub async fn for_subject(
        &self,
        subject_reg_number: &str,
        bucket: &MonthBucket,
    ) -> Result<Vec<ReviewRecord>> {
        let rows = Reviews::find()
            .filter(reviews::Column::SubjectRegNumber.eq(subject_reg_number))
            .filter(reviews::Column::MonthYear.eq(bucket.as_str()))
            .order_by_asc(reviews::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to query reviews for subject")?;

        Ok(rows)
    }

    pub async fn count_in_bucket(&self, bucket: &MonthBucket) -> Result<u64> {
        use sea_orm::PaginatorTrait;

        let count = Reviews::find()
            .filter(reviews::Column::MonthYear.eq(bucket.as_str()))
            .count(&self.conn)
            .await?;

        Ok(count)
    }

    /// Deletes every review whose bucket differs from `current`.
    pub async fn delete_outside_bucket(&self, current: &MonthBucket) -> Result<u64> {
        let result = Reviews::delete_many()
            .filter(reviews::Column::MonthYear.ne(current.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to purge stale reviews")?;

        Ok(result.rows_affected)
    }
}
