//! Caller identity extraction
//!
//! Authentication happens upstream; by the time a request reaches the
//! service the authenticated user is carried in the `X-User-ID` header.
//! Every store operation is scoped to that id.

use crate::errors::{AppError, Result};
use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use uuid::Uuid;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the request id set by the request-id layer
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Extracted caller context available to handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Owner of every record the request touches
    pub user_id: Uuid,

    /// Request ID for tracing
    pub request_id: String,
}

/// Parse the user id header
pub fn extract_user_id(headers: &HeaderMap) -> Result<Uuid> {
    let raw = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized {
            message: "Missing X-User-ID header".to_string(),
        })?;

    Uuid::parse_str(raw.trim()).map_err(|_| AppError::Unauthorized {
        message: "Invalid X-User-ID header".to_string(),
    })
}

/// Axum extractor for AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let user_id = extract_user_id(&parts.headers)?;

        Ok(AuthContext {
            user_id,
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(builder: axum::http::request::Builder) -> Result<AuthContext> {
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_extracts_user_and_request_id() {
        let user = Uuid::new_v4();
        let ctx = extract(
            Request::builder()
                .header(USER_ID_HEADER, user.to_string())
                .header(REQUEST_ID_HEADER, "req-42"),
        )
        .await
        .unwrap();

        assert_eq!(ctx.user_id, user);
        assert_eq!(ctx.request_id, "req-42");
    }

    #[tokio::test]
    async fn test_generates_request_id_when_absent() {
        let ctx = extract(Request::builder().header(USER_ID_HEADER, Uuid::new_v4().to_string()))
            .await
            .unwrap();
        assert!(Uuid::parse_str(&ctx.request_id).is_ok());
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let err = extract(Request::builder()).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_user_is_unauthorized() {
        let err = extract(Request::builder().header(USER_ID_HEADER, "not-a-uuid"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }
}
