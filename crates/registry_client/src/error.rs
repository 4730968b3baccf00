//! Client-side error taxonomy.
//!
//! Every failure mode is a distinct variant so that a transport fault is
//! never mistaken for an absent instance.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("registry rejected the shared secret")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not a member: {0}")]
    NotAMember(String),

    /// The mutation may have been partly applied. Reconcile, do not retry.
    #[error("partial failure: {0}")]
    PartialFailure(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("registry error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("registry call timed out")]
    Timeout,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("failed to decode registry response: {0}")]
    Decode(String),

    #[error("invalid registry base url: {0}")]
    InvalidBaseUrl(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}
