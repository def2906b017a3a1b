use super::ApiError;
use crate::services::review_service::{MAX_RATING, MIN_RATING};

pub fn validate_required<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// Shape check only: one `@`, non-empty local part, a dot in the domain.
pub fn validate_email<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let email = validate_required(field, value)?;

    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        })
        && !email.chars().any(char::is_whitespace);

    if !valid {
        return Err(ApiError::validation(format!(
            "{field} must be a valid email address"
        )));
    }
    Ok(email)
}

pub fn validate_password(password: &str, min_length: usize) -> Result<&str, ApiError> {
    if password.chars().count() < min_length {
        return Err(ApiError::validation(format!(
            "Password must be at least {min_length} characters"
        )));
    }
    Ok(password)
}

pub fn validate_rating(rating: i32) -> Result<i32, ApiError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ApiError::validation(format!(
            "Invalid rating: {rating}. Rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    Ok(rating)
}

/// Empty or whitespace-only optional fields become `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert_eq!(validate_required("Name", "  Asha ").unwrap(), "Asha");
        assert!(validate_required("Name", "").is_err());
        assert!(validate_required("Name", "   ").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("Email", "a@vit.ac.in").is_ok());
        assert!(validate_email("Email", "first.last@example.com").is_ok());
        assert!(validate_email("Email", "").is_err());
        assert!(validate_email("Email", "no-at-sign").is_err());
        assert!(validate_email("Email", "@example.com").is_err());
        assert!(validate_email("Email", "a@nodot").is_err());
        assert!(validate_email("Email", "a@b@c.com").is_err());
        assert!(validate_email("Email", "a b@c.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("123456", 6).is_ok());
        assert!(validate_password("12345", 6).is_err());
        assert!(validate_password("", 6).is_err());
    }

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
        assert!(validate_rating(-3).is_err());
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(None), None);
        assert_eq!(normalize_optional(Some("  ".to_string())), None);
        assert_eq!(
            normalize_optional(Some(" A-101 ".to_string())),
            Some("A-101".to_string())
        );
    }
}
