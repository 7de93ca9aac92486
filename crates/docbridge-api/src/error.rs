use axum::{http::StatusCode, response::IntoResponse, Json};
use tracing::{error, warn};

/// Errors returned by HTTP handlers. Rendered as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    Internal(String),
}

impl From<docbridge_core::Error> for ApiError {
    fn from(err: docbridge_core::Error) -> Self {
        use docbridge_core::Error;

        match err {
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Request(_)
            | Error::Inference(_)
            | Error::MalformedResponse(_)
            | Error::Serialization(_) => ApiError::BadGateway(err.to_string()),
            Error::Config(_) | Error::Internal(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => msg,
            ApiError::BadGateway(msg) => {
                warn!(error = %msg, "Upstream request failed");
                msg
            }
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                msg
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
