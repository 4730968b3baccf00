//! Error types for the instance registry

use crate::location::LocationError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failures of a single store primitive.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The store primitive a multi-step mutation was executing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStep {
    AppendPlayer,
    RemovePlayer,
    AdjustTotal,
    AdjustPlatform,
    Touch,
}

impl fmt::Display for MutationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationStep::AppendPlayer => "append player",
            MutationStep::RemovePlayer => "remove player",
            MutationStep::AdjustTotal => "adjust total count",
            MutationStep::AdjustPlatform => "adjust platform count",
            MutationStep::Touch => "touch last activity",
        };
        f.write_str(name)
    }
}

/// Registry-level failure taxonomy.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Normal negative result, not a fault
    #[error("instance {0} not found")]
    NotFound(String),

    #[error("user {user_id} is not a member of instance {instance_id}")]
    NotAMember { instance_id: String, user_id: String },

    #[error("malformed location: {0}")]
    MalformedLocation(#[from] LocationError),

    #[error("invalid instance: {0}")]
    InvalidInstance(String),

    /// Some steps of a mutation landed and some did not. The document may be
    /// inconsistent and must be reconciled, never retried blindly.
    #[error("partial failure on instance {instance_id} during {step}: {source}")]
    PartialFailure {
        instance_id: String,
        step: MutationStep,
        source: StoreError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound(_))
    }
}
