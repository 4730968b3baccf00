//! Response bodies of the registry HTTP surface.
//!
//! Shared by the server, which produces them, and the client, which decodes
//! them. `GET /{id}`, `POST /register/{id}` and `POST /reconcile/{id}` return a
//! bare [`Instance`].

use crate::instance::Instance;
use serde::{Deserialize, Serialize};

/// `GET /world/{worldId}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldInstancesResponse {
    pub instances: Vec<Instance>,
    /// More instances matched than fit in one page
    pub truncated: bool,
    /// Always false; there is no way to fetch the next page
    pub paging_supported: bool,
}

/// `GET /player/{playerId}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInstancesResponse {
    pub player_id: String,
    pub instances: Vec<Instance>,
}

/// Acknowledgement for ping, membership and block mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckResponse {
    pub id: String,
    pub ok: bool,
}

impl AckResponse {
    pub fn ok(id: impl Into<String>) -> Self {
        Self { id: id.into(), ok: true }
    }
}

/// `POST /unregister/{id}`. Unregistering an absent instance is not an error;
/// `removed` tells the two cases apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnregisterResponse {
    pub id: String,
    pub removed: bool,
}

/// Stable machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    NotAMember,
    MalformedLocation,
    BadRequest,
    Unauthorized,
    PartialFailure,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorCode,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_response_field_names() {
        let body = WorldInstancesResponse {
            instances: Vec::new(),
            truncated: false,
            paging_supported: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["pagingSupported"], false);
        assert!(json["instances"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_error_code_encoding() {
        let body = ErrorResponse {
            error: ErrorCode::NotAMember,
            message: "user usr_1 is not a member".into(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"not_a_member\""));
        let back: ErrorResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.error, ErrorCode::NotAMember);
    }
}
