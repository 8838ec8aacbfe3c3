use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

use service::errors::ServiceError;

/// Error returned by handlers; rendered as `{"error": .., "code": ..}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(ServiceError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Service(ServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Service(ServiceError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Service(ServiceError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Service(ServiceError::Persistence(_) | ServiceError::Internal(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> u16 {
        match self {
            ApiError::Service(e) => e.code(),
            ApiError::Internal(_) => 1500,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = self.to_string();
        if status.is_server_error() {
            error!(error = %msg, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %msg, "request rejected");
        }
        (status, Json(serde_json::json!({"error": msg, "code": self.code()}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_service_errors_to_status() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::not_found("toy", "t1"), StatusCode::NOT_FOUND),
            (ServiceError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::Persistence("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ServiceError::Internal("cannot hash password".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn response_carries_status() {
        let resp = ApiError::from(ServiceError::not_found("car", "c1")).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
