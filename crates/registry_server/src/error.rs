//! Error types for the registry server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use registry_core::wire::{ErrorCode, ErrorResponse};
use registry_core::{LocationError, RegistryError};
use thiserror::Error;
use tracing::error;

/// Failures of the server process itself.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("network error: {0}")]
    Network(String),
}

/// Failure of a single request, rendered as an [`ErrorResponse`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or invalid shared secret")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<LocationError> for ApiError {
    fn from(e: LocationError) -> Self {
        ApiError::Registry(e.into())
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, ErrorCode, String) {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorCode::Unauthorized,
                self.to_string(),
            ),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadRequest, message.clone())
            }
            ApiError::Registry(e) => match e {
                RegistryError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, ErrorCode::NotFound, e.to_string())
                }
                RegistryError::NotAMember { .. } => {
                    (StatusCode::NOT_FOUND, ErrorCode::NotAMember, e.to_string())
                }
                RegistryError::MalformedLocation(_) => (
                    StatusCode::BAD_REQUEST,
                    ErrorCode::MalformedLocation,
                    e.to_string(),
                ),
                RegistryError::InvalidInstance(_) => {
                    (StatusCode::BAD_REQUEST, ErrorCode::BadRequest, e.to_string())
                }
                RegistryError::PartialFailure {
                    instance_id, step, ..
                } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::PartialFailure,
                    format!("instance {instance_id} left inconsistent during {step}; reconcile required"),
                ),
                RegistryError::Store(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Internal,
                    "registry store unavailable".to_string(),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(ErrorResponse { error: code, message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_core::{MutationStep, StoreError};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (RegistryError::NotFound("i".into()).into(), StatusCode::NOT_FOUND),
            (
                RegistryError::NotAMember {
                    instance_id: "i".into(),
                    user_id: "u".into(),
                }
                .into(),
                StatusCode::NOT_FOUND,
            ),
            (LocationError::EmptyWorld.into(), StatusCode::BAD_REQUEST),
            (
                RegistryError::InvalidInstance("cap".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.parts().0, status);
        }
    }

    #[test]
    fn test_store_details_are_not_leaked() {
        let err: ApiError =
            RegistryError::Store(StoreError::Unavailable("redis://10.0.0.5:6379".into())).into();
        let (status, code, message) = err.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, ErrorCode::Internal);
        assert!(!message.contains("10.0.0.5"));

        let partial: ApiError = RegistryError::PartialFailure {
            instance_id: "inst".into(),
            step: MutationStep::AdjustTotal,
            source: StoreError::Unavailable("redis://10.0.0.5:6379".into()),
        }
        .into();
        let (_, code, message) = partial.parts();
        assert_eq!(code, ErrorCode::PartialFailure);
        assert!(!message.contains("10.0.0.5"));
    }
}
