//! Claim sets carried by signed tokens.

use serde::{Deserialize, Serialize};

/// Everything the session authority needs to admit a player to an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinClaims {
    /// Unique join id
    pub jti: String,
    /// Joining user id
    pub sub: String,
    /// Placeholder until the session authority assigns a session
    pub session_id: String,
    /// Address the join was requested from
    pub ip: String,
    /// Full location string of the target instance
    pub location: String,
    pub world_id: String,
    pub world_author_id: String,
    pub world_name: String,
    pub world_tags: Vec<String>,
    pub world_capacity: u32,
    pub instance_owner_id: String,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
    pub iss: String,
}

impl JoinClaims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

/// Which side of a handshake a simple token was minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Client,
    Server,
}

impl TokenKind {
    pub fn from_client_flag(client: bool) -> Self {
        if client {
            TokenKind::Client
        } else {
            TokenKind::Server
        }
    }
}

/// Lightweight keyed credential binding a user to an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleClaims {
    pub sub: String,
    pub ip: String,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}
