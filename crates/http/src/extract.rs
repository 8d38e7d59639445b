//! Request extractors that reject with [`AppError`] instead of plain text.

use axum::extract::FromRequest;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;

/// JSON body extractor; malformed or mistyped bodies become 400 validation errors.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: serde::Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}
