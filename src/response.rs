/// Standard response envelope
///
/// Every endpoint answers with `{statusCode, data, message, success}`.
/// Failures use the same shape through `error::ErrorResponse`.

use actix_web::{http::StatusCode, HttpResponse, HttpResponseBuilder};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.as_u16() < 400,
        }
    }

    /// Builder with the matching status so callers can attach cookies first
    pub fn builder(&self) -> HttpResponseBuilder {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK))
    }

    pub fn into_response(self) -> HttpResponse {
        self.builder().json(self)
    }
}
