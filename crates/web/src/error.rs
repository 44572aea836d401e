//! Mapping of analysis failures to HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use stockfish_server_core::{AnalysisError, ErrorClass};

/// An error as reported to the HTTP caller
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    /// Render as a failed analysis (`{fen, success: false, error}`)
    analysis: bool,
    fen: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            analysis: false,
            fen: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            analysis: false,
            fen: None,
        }
    }

    /// Switches to the `/analyze` failure shape
    pub fn in_analysis(mut self) -> Self {
        self.analysis = true;
        self
    }

    pub fn with_fen(mut self, fen: impl Into<String>) -> Self {
        self.fen = Some(fen.into());
        self
    }
}

impl From<AnalysisError> for ApiError {
    fn from(error: AnalysisError) -> Self {
        let status = match error.status_class() {
            ErrorClass::Client => StatusCode::BAD_REQUEST,
            ErrorClass::Server => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorClass::Busy => StatusCode::SERVICE_UNAVAILABLE,
        };

        Self {
            status,
            message: error.to_string(),
            analysis: false,
            fen: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body: Value = if self.analysis {
            let mut body = json!({
                "success": false,
                "error": self.message,
            });
            if let Some(fen) = self.fen {
                body["fen"] = Value::String(fen);
            }
            body
        } else {
            json!({ "error": self.message })
        };

        (self.status, Json(body)).into_response()
    }
}
