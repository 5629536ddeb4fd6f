use actix_web::{HttpResponse, error::InternalError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[error("{field}: {message}")]
pub struct FieldError {
    #[schema(value_type = String, example = "full_name")]
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// 400 carrying the error as a JSON `message`.
pub fn invalid<E>(e: E) -> actix_web::Error
where
    E: std::fmt::Debug + std::fmt::Display + 'static,
{
    let resp = HttpResponse::BadRequest().json(json!({ "message": e.to_string() }));
    InternalError::from_response(e, resp).into()
}

/// Trimmed value, or an error when nothing is left.
pub fn required(field: &'static str, value: &str, message: &str) -> Result<String, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(FieldError::new(field, message))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Empty strings clear the column; anything else must be an absolute URL.
pub fn optional_url(field: &'static str, value: Option<String>) -> Result<Option<String>, FieldError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => url::Url::parse(raw)
            .map(|_| Some(raw.to_string()))
            .map_err(|_| FieldError::new(field, "URL ảnh không hợp lệ")),
    }
}

/// Blank strings are stored as NULL.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("full_name", "  An ", "x").unwrap(), "An");
        assert_eq!(
            required("full_name", "   ", "Họ tên bắt buộc").unwrap_err(),
            FieldError::new("full_name", "Họ tên bắt buộc")
        );
    }

    #[test]
    fn url_validation() {
        assert_eq!(optional_url("avatar_url", Some("".into())).unwrap(), None);
        assert_eq!(optional_url("avatar_url", None).unwrap(), None);
        assert_eq!(
            optional_url("avatar_url", Some(" https://cdn.example.com/a.png ".into())).unwrap(),
            Some("https://cdn.example.com/a.png".into())
        );
        assert!(optional_url("avatar_url", Some("not a url".into())).is_err());
    }

    #[test]
    fn blank_text_becomes_none() {
        assert_eq!(optional_text(Some("  ".into())), None);
        assert_eq!(optional_text(Some(" Kinh ".into())), Some("Kinh".into()));
    }
}
