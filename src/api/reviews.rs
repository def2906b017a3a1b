use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{validate_rating, validate_required};
use super::{ApiError, ApiResponse, AppState, CreatedResponse, PersonDto, ReviewDto};
use crate::db::NewReview;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewPayload {
    pub reviewer_reg_number: String,
    pub subject_reg_number: String,
    pub content: String,
    pub rating: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsQuery {
    pub subject_reg_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeopleQuery {
    pub exclude_reg_number: Option<String>,
}

/// POST /reviews
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateReviewPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedResponse>>), ApiError> {
    let Json(payload) = payload?;
    let review = NewReview {
        reviewer_reg_number: validate_required(
            "Reviewer registration number",
            &payload.reviewer_reg_number,
        )?
        .to_string(),
        subject_reg_number: validate_required(
            "Subject registration number",
            &payload.subject_reg_number,
        )?
        .to_string(),
        content: validate_required("Content", &payload.content)?.to_string(),
        rating: validate_rating(payload.rating)?,
    };

    let id = state.review_service().create_review(review).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedResponse { id })),
    ))
}

/// GET /reviews?subjectRegNumber=
/// Current-month reviews for one member. No subject yields an empty list.
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ReviewsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<ReviewDto>>>, ApiError> {
    let Query(query) = query?;
    let Some(subject) = query
        .subject_reg_number
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    else {
        return Ok(Json(ApiResponse::success(Vec::new())));
    };

    let reviews = state.review_service().reviews_for_subject(subject).await?;

    Ok(Json(ApiResponse::success(
        reviews.into_iter().map(ReviewDto::from).collect(),
    )))
}

/// GET /reviews/people?excludeRegNumber=
pub async fn list_people(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PeopleQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<PersonDto>>>, ApiError> {
    let Query(query) = query?;
    let exclude = query
        .exclude_reg_number
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let people = state.review_service().list_people(exclude).await?;

    Ok(Json(ApiResponse::success(
        people.into_iter().map(PersonDto::from).collect(),
    )))
}
