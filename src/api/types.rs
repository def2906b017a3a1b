use serde::{Deserialize, Serialize};

use crate::db::{Person, ReviewRecord};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDto {
    pub id: i32,
    pub reviewer_reg_number: String,
    pub subject_reg_number: String,
    pub content: String,
    pub rating: i32,
    pub month_year: String,
    pub created_at: String,
}

impl From<ReviewRecord> for ReviewDto {
    fn from(record: ReviewRecord) -> Self {
        Self {
            id: record.id,
            reviewer_reg_number: record.reviewer_reg_number,
            subject_reg_number: record.subject_reg_number,
            content: record.content,
            rating: record.rating,
            month_year: record.month_year,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDto {
    pub name: String,
    pub reg_number: String,
}

impl From<Person> for PersonDto {
    fn from(person: Person) -> Self {
        Self {
            name: person.name,
            reg_number: person.reg_number,
        }
    }
}
