//! HTTP error rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

/// Error returned by handlers. Renders as `{"error": message, "kind": kind}`.
#[derive(Debug)]
pub enum ApiError {
    Core(kbcheck_core::Error),
    BadRequest(String),
    ServiceUnavailable(String),
}

impl From<kbcheck_core::Error> for ApiError {
    fn from(err: kbcheck_core::Error) -> Self {
        ApiError::Core(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use kbcheck_core::Error;

        match self {
            ApiError::Core(err) => match err {
                Error::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
                Error::Transport(_) => StatusCode::BAD_GATEWAY,
                Error::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
                Error::ProcessingFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
                Error::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
                Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                Error::Serialization(_) | Error::Internal(_) | Error::Io(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Core(err) => err.kind(),
            ApiError::BadRequest(_) => "invalid_input",
            ApiError::ServiceUnavailable(_) => "config",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let message = match self {
            ApiError::Core(err) => err.to_string(),
            ApiError::BadRequest(msg) | ApiError::ServiceUnavailable(msg) => msg,
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), kind, error = %message, "Request failed");
        }

        let body = Json(serde_json::json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbcheck_core::Error;

    #[test]
    fn test_core_error_statuses() {
        let cases = [
            (Error::Config("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (Error::Transport("x".into()), StatusCode::BAD_GATEWAY),
            (Error::QuotaExceeded("x".into()), StatusCode::TOO_MANY_REQUESTS),
            (Error::ProcessingFailed("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (Error::TimedOut("x".into()), StatusCode::GATEWAY_TIMEOUT),
            (Error::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (Error::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (Error::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_kind_follows_core_error() {
        assert_eq!(
            ApiError::from(Error::QuotaExceeded("x".into())).kind(),
            "quota_exceeded"
        );
        assert_eq!(
            ApiError::from(Error::Unauthorized("x".into())).kind(),
            "unauthorized"
        );
        assert_eq!(ApiError::ServiceUnavailable("x".into()).kind(), "config");
    }

    #[tokio::test]
    async fn test_response_body_shape() {
        let response = ApiError::from(Error::TimedOut("still processing".into())).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["kind"], "timed_out");
        assert_eq!(body["error"], "Timed out: still processing");
    }
}
