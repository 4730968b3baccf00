use super::AppState;
use crate::error::ApiError;
use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderMap, Uri};
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::warn;

#[derive(Deserialize)]
struct SecretParam {
    secret: Option<String>,
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn query_secret(uri: &Uri) -> Option<String> {
    Query::<SecretParam>::try_from_uri(uri).ok()?.0.secret
}

fn is_authorized(supplied: Option<&str>, expected: &str) -> bool {
    supplied.is_some_and(|secret| bool::from(secret.as_bytes().ct_eq(expected.as_bytes())))
}

/// Rejects any request that does not carry the shared secret.
pub(crate) async fn require_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let supplied = bearer(request.headers()).or_else(|| query_secret(request.uri()));

    if is_authorized(supplied.as_deref(), &state.shared_secret) {
        return Ok(next.run(request).await);
    }

    warn!(
        "🔒 Rejected unauthenticated {} {}",
        request.method(),
        request.uri().path()
    );
    Err(ApiError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert_eq!(bearer(&headers).as_deref(), Some("s3cret"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer(&headers), None);
    }

    #[test]
    fn test_query_secret_extraction() {
        let uri: Uri = "/world/wrld_X?type=public&secret=s3cret".parse().unwrap();
        assert_eq!(query_secret(&uri).as_deref(), Some("s3cret"));

        let uri: Uri = "/world/wrld_X".parse().unwrap();
        assert_eq!(query_secret(&uri), None);
    }

    #[test]
    fn test_secret_comparison() {
        assert!(is_authorized(Some("hunter2"), "hunter2"));
        assert!(!is_authorized(Some("hunter3"), "hunter2"));
        assert!(!is_authorized(Some("hunter"), "hunter2"));
        assert!(!is_authorized(Some("hunter22"), "hunter2"));
        assert!(!is_authorized(Some(""), "hunter2"));
        assert!(!is_authorized(None, "hunter2"));
    }
}
