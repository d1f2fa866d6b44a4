use crate::server::response::ApiError;

const MIN_DISPLAY_NAME_LEN: usize = 5;
const MAX_DISPLAY_NAME_LEN: usize = 64;
const MIN_PASSWORD_LEN: usize = 8;
const MIN_REVIEW_LEN: usize = 10;

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Uploads are capped at 1MB and must be one of the accepted image types.
pub const MAX_IMAGE_BYTES: usize = 1_000_000;
const ACCEPTED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

pub fn validate_display_name(name: &str) -> Result<(), ApiError> {
    let name = name.trim();
    if name.len() < MIN_DISPLAY_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Display name must be at least {MIN_DISPLAY_NAME_LEN} characters long"
        )));
    }
    if name.len() > MAX_DISPLAY_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Display name cannot exceed {MAX_DISPLAY_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

/// Shape check only; deliverability is not our problem.
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(())
}

pub fn validate_rating(rating: i64) -> Result<(), ApiError> {
    if !(1..=5).contains(&rating) {
        return Err(ApiError::bad_request("Rating must be between 1 and 5"));
    }
    Ok(())
}

pub fn validate_review_text(review: &str) -> Result<(), ApiError> {
    if review.trim().len() < MIN_REVIEW_LEN {
        return Err(ApiError::bad_request(format!(
            "Review must be at least {MIN_REVIEW_LEN} characters long"
        )));
    }
    Ok(())
}

pub fn validate_required(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    Ok(())
}

/// Validates an uploaded image's declared type and size.
pub fn validate_image(content_type: Option<&str>, size: usize) -> Result<(), ApiError> {
    let Some(content_type) = content_type else {
        return Err(ApiError::bad_request("Missing image content type"));
    };

    if !ACCEPTED_IMAGE_TYPES.contains(&content_type) {
        return Err(ApiError::bad_request(
            "Only JPEG, PNG, or WEBP images are allowed",
        ));
    }
    if size > MAX_IMAGE_BYTES {
        return Err(ApiError::bad_request("File must be less than 1MB"));
    }
    Ok(())
}

/// File extension for an accepted image content type.
#[must_use]
pub fn image_extension(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// Clamps list query params to limit in [1,100] (default 10) and a
/// non-negative offset (default 0).
pub fn validate_pagination(
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<(i64, i64), ApiError> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(ApiError::bad_request("Limit must be between 1 and 100"));
    }

    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(ApiError::bad_request(
            "Offset must be greater than or equal to 0",
        ));
    }

    Ok((limit, offset))
}
