//! Request extractors that report failures through [`ApiError`].

use axum::extract::{rejection::JsonRejection, FromRequest};

use super::error::ApiError;

/// `axum::Json` with rejections rendered as the usual `{code, message}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Well-formed JSON of the wrong shape: missing fields, wrong types
            JsonRejection::JsonDataError(_) => ApiError::Validation(rejection.body_text()),
            _ => ApiError::BadRequest(rejection.body_text()),
        }
    }
}
