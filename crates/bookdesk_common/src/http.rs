// --- File: crates/bookdesk_common/src/http.rs ---
use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::error::{invalid_input, BookdeskError, HttpStatusCode};

pub mod client;

/// Renders every error as `{ "ok": false, "error": "<message>" }`.
impl IntoResponse for BookdeskError {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code.is_server_error() {
            error!("Request failed with {}: {}", status_code, self);
        }

        let body = Json(json!({
            "ok": false,
            "error": self.to_string(),
        }));

        (status_code, body).into_response()
    }
}

/// `Json` extractor whose rejections render as `{ok:false}` 400 bodies.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(BookdeskError))]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for BookdeskError {
    fn from(rejection: JsonRejection) -> Self {
        invalid_input(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

/// Converts a feature-level result into a JSON handler result.
pub fn map_json_error<T, E, F>(result: Result<T, E>, f: F) -> Result<Json<T>, BookdeskError>
where
    T: serde::Serialize,
    F: FnOnce(E) -> BookdeskError,
{
    result.map(Json).map_err(f)
}

/// Fallback for known routes hit with the wrong method.
pub async fn method_not_allowed() -> BookdeskError {
    BookdeskError::MethodNotAllowed
}

/// Fallback for unknown routes.
pub async fn not_found() -> BookdeskError {
    BookdeskError::NotFound("Not found".to_string())
}
