//! Structured errors for protocol dispatch.
//!
//! Each variant maps to an HTTP status code, a machine-readable code string,
//! and the human-readable message sent to the caller inside the error
//! envelope. Internal failures deliberately carry no detail on the wire;
//! whatever caused them is logged server-side at the point of conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::envelope::ResponseEnvelope;

#[derive(Debug, Error)]
pub enum RpcError {
    /// 400 - Arguments failed schema validation. The message enumerates
    /// every failing field.
    #[error("{0}")]
    InvalidInput(String),

    /// 404 - No handler registered for the method, or an unrecognized
    /// sub-command.
    #[error("Unknown method: {0}")]
    MethodNotFound(String),

    /// 401 - Missing or mismatched API key.
    #[error("Invalid API key")]
    Unauthorized,

    /// 409 - No editing surface is focused to act on.
    #[error("No active editor target")]
    NoActiveTarget,

    /// 500 - Unexpected failure inside a handler. Never carries detail.
    #[error("Internal server error")]
    Internal,
}

impl RpcError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RpcError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RpcError::MethodNotFound(_) => StatusCode::NOT_FOUND,
            RpcError::Unauthorized => StatusCode::UNAUTHORIZED,
            RpcError::NoActiveTarget => StatusCode::CONFLICT,
            RpcError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            RpcError::InvalidInput(_) => "invalid_input",
            RpcError::MethodNotFound(_) => "method_not_found",
            RpcError::Unauthorized => "unauthorized",
            RpcError::NoActiveTarget => "no_active_target",
            RpcError::Internal => "internal_error",
        }
    }

    /// The error envelope sent to the caller.
    pub fn to_envelope(&self) -> ResponseEnvelope {
        ResponseEnvelope::error(self.to_string())
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_envelope())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_parts(err: RpcError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn invalid_input_maps_to_400() {
        let (status, json) =
            response_parts(RpcError::InvalidInput("Missing required field: text".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["isError"], true);
        assert_eq!(
            json["content"][0]["text"],
            "Missing required field: text"
        );
    }

    #[tokio::test]
    async fn method_not_found_maps_to_404() {
        let (status, json) = response_parts(RpcError::MethodNotFound("bogus".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["content"][0]["text"], "Unknown method: bogus");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_401() {
        let (status, json) = response_parts(RpcError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["content"][0]["text"], "Invalid API key");
    }

    #[tokio::test]
    async fn no_active_target_maps_to_409() {
        let (status, _) = response_parts(RpcError::NoActiveTarget).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn internal_error_carries_no_detail() {
        let (status, json) = response_parts(RpcError::Internal).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["content"][0]["text"], "Internal server error");
    }

    #[test]
    fn code_strings() {
        assert_eq!(RpcError::InvalidInput(String::new()).code(), "invalid_input");
        assert_eq!(
            RpcError::MethodNotFound(String::new()).code(),
            "method_not_found"
        );
        assert_eq!(RpcError::Unauthorized.code(), "unauthorized");
        assert_eq!(RpcError::NoActiveTarget.code(), "no_active_target");
        assert_eq!(RpcError::Internal.code(), "internal_error");
    }
}
