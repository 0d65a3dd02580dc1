//! Bearer-token gate for the HTTP pipeline.
//!
//! This is the outer, statically-configured check (`auth_token` in the
//! network config), applied before any protocol dispatch. It is independent
//! of the per-session credential verified by the dispatch middleware; both
//! gates exist for compatibility with deployed clients (see DESIGN.md).

use axum::{extract::Request, middleware::Next, response::Response};
use subtle::ConstantTimeEq;

use super::error::RpcError;

/// Extract a Bearer token from the Authorization header.
fn extract_bearer(req: &Request) -> Option<String> {
    req.headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Reject requests whose Authorization header does not carry the expected
/// bearer token. Comparison is constant-time.
pub async fn require_bearer(
    expected_token: String,
    req: Request,
    next: Next,
) -> Result<Response, RpcError> {
    match extract_bearer(&req) {
        Some(token) if bool::from(token.as_bytes().ct_eq(expected_token.as_bytes())) => {
            Ok(next.run(req).await)
        }
        _ => Err(RpcError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    async fn ok_handler() -> &'static str {
        "ok"
    }

    fn test_app(token: &str) -> Router {
        let token = token.to_string();
        Router::new()
            .route("/test", post(ok_handler))
            .layer(axum::middleware::from_fn(move |req, next| {
                let token = token.clone();
                async move { require_bearer(token, req, next).await }
            }))
    }

    #[test]
    fn extract_bearer_with_header() {
        let req = Request::builder()
            .uri("/test")
            .header("authorization", "Bearer my-secret-token")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_bearer(&req), Some("my-secret-token".to_string()));
    }

    #[test]
    fn extract_bearer_without_header() {
        let req = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert_eq!(extract_bearer(&req), None);
    }

    #[test]
    fn extract_bearer_rejects_other_scheme() {
        let req = Request::builder()
            .uri("/test")
            .header("authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_bearer(&req), None);
    }

    #[tokio::test]
    async fn valid_token_passes() {
        let response = test_app("secret")
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/test")
                    .header("authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let response = test_app("secret")
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_token_is_unauthorized() {
        let response = test_app("secret")
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/test")
                    .header("authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
