//! `IntoResponse` for the crate's error types

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

fn json_error(status: StatusCode, body: ApiError) -> Response {
    (status, Json(body)).into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        json_error(status, self.into())
    }
}

/// A bare `ApiError` carries no status of its own and is reported as a 500
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        json_error(StatusCode::INTERNAL_SERVER_ERROR, self)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> ApiError {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn shutting_down_becomes_503() {
        let response = Error::ShuttingDown.into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_of(response).await.error.code, "shutting_down");
    }

    #[tokio::test]
    async fn invalid_input_becomes_400() {
        let response = Error::InvalidInput("input must not be blank".into()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let api_error = body_of(response).await;
        assert_eq!(api_error.error.code, "validation_error");
        assert!(api_error.error.message.contains("must not be blank"));
    }

    #[tokio::test]
    async fn bare_api_error_defaults_to_500() {
        let response = ApiError::internal("boom").into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await.error.code, "internal_error");
    }
}
