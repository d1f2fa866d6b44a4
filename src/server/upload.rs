use axum::extract::Multipart;
use bytes::Bytes;

use crate::server::response::ApiError;
use crate::server::validation::{image_extension, validate_image};

/// A validated image pulled out of a multipart body.
pub(crate) struct ImageUpload {
    pub content_type: String,
    pub data: Bytes,
}

impl ImageUpload {
    pub fn extension(&self) -> &'static str {
        image_extension(&self.content_type)
    }
}

/// Reads a multipart body expecting one accepted image under `field_name`.
/// Unknown fields are ignored.
pub(crate) async fn read_single_image(
    mut multipart: Multipart,
    field_name: &str,
) -> Result<ImageUpload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Malformed multipart body"))?
    {
        if field.name() != Some(field_name) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::bad_request("Failed to read uploaded file"))?;
        validate_image(content_type.as_deref(), data.len())?;

        return Ok(ImageUpload {
            content_type: content_type.unwrap_or_default(),
            data,
        });
    }

    Err(ApiError::bad_request(format!("Missing {field_name} file")))
}
