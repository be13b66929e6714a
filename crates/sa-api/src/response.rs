//! Success envelope: `{"message": ..., "data": ...}`

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub message: String,
    pub data: T,
}

pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(Envelope {
            message: message.into(),
            data,
        }),
    )
}

/// Envelope with `data: null`
pub fn ok_empty(message: impl Into<String>) -> impl IntoResponse {
    ok(message, serde_json::Value::Null)
}
