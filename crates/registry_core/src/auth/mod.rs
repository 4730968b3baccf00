//! Join authorization.
//!
//! A join token is an HS256-signed JWT that binds a user, an instance location
//! and the requesting IP address for a limited time. It is minted when the API
//! service accepts a join request and redeemed by the session authority when
//! the player actually connects. Tokens are never stored: expiry is carried in
//! the token itself and there is no revocation list.
//!
//! Validation only proves the token is authentic and unexpired. Whether the
//! embedded location still names a live registry entry is for the caller to
//! check.
//!
//! The simple token flavour (see [`JoinAuthority::issue_simple`]) is a smaller
//! credential used for handshakes that only need "who, from where".

mod claims;
mod simple;

pub use claims::{JoinClaims, SimpleClaims, TokenKind};

use crate::utils::current_timestamp;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_ISSUER: &str = "horizon-registry";
pub const DEFAULT_AUDIENCE: &str = "horizon-session";
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Every way a token can be rejected. Callers that only care about
/// accept/reject treat all variants as "invalid".
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token expired")]
    Expired,

    #[error("token bound to a different address")]
    IpMismatch,

    #[error("token kind mismatch: expected {expected:?}")]
    WrongKind { expected: TokenKind },

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("signing secret is not configured")]
    MissingSecret,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub signing_secret: String,
    pub issuer: String,
    pub audience: String,
    /// Lifetime used when `issue` is not given an explicit ttl
    pub token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_secret: String::new(),
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }
}

impl AuthConfig {
    /// Reads `REGISTRY_SIGNING_SECRET`, `REGISTRY_TOKEN_ISSUER`,
    /// `REGISTRY_TOKEN_AUDIENCE` and `REGISTRY_TOKEN_TTL_SECS`, keeping the
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let token_ttl = std::env::var("REGISTRY_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.token_ttl);

        Self {
            signing_secret: std::env::var("REGISTRY_SIGNING_SECRET").unwrap_or_default(),
            issuer: std::env::var("REGISTRY_TOKEN_ISSUER").unwrap_or(defaults.issuer),
            audience: std::env::var("REGISTRY_TOKEN_AUDIENCE").unwrap_or(defaults.audience),
            token_ttl,
        }
    }
}

/// Inputs to a join token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinGrant {
    pub user_id: String,
    pub location: String,
    pub world_id: String,
    pub world_author_id: String,
    pub world_name: String,
    pub world_tags: Vec<String>,
    pub world_capacity: u32,
    pub instance_owner_id: String,
    pub requester_ip: String,
}

/// Mints and checks signed tokens with a single shared HMAC key.
pub struct JoinAuthority {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JoinAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinAuthority")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}

impl JoinAuthority {
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        if config.signing_secret.is_empty() {
            return Err(AuthError::MissingSecret);
        }
        let secret = config.signing_secret.as_bytes();
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            config,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn issue(&self, grant: &JoinGrant, ttl: Option<Duration>) -> Result<String, AuthError> {
        self.issue_at(grant, ttl, current_timestamp())
    }

    /// Mints a join token as if the current time were `now`.
    ///
    /// # Arguments
    ///
    /// * `grant` - User, instance and world facts to embed
    /// * `ttl` - Token lifetime, the configured default when `None`
    /// * `now` - Issue time in epoch seconds
    pub fn issue_at(
        &self,
        grant: &JoinGrant,
        ttl: Option<Duration>,
        now: i64,
    ) -> Result<String, AuthError> {
        let ttl = ttl.unwrap_or(self.config.token_ttl);
        let claims = JoinClaims {
            jti: Uuid::new_v4().to_string(),
            sub: grant.user_id.clone(),
            session_id: String::new(),
            ip: grant.requester_ip.clone(),
            location: grant.location.clone(),
            world_id: grant.world_id.clone(),
            world_author_id: grant.world_author_id.clone(),
            world_name: grant.world_name.clone(),
            world_tags: grant.world_tags.clone(),
            world_capacity: grant.world_capacity,
            instance_owner_id: grant.instance_owner_id.clone(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
        };

        debug!("Issuing join token {} for {} at {}", claims.jti, claims.sub, claims.location);
        self.sign(&claims)
    }

    pub fn validate(&self, token: &str) -> Result<JoinClaims, AuthError> {
        self.validate_at(token, current_timestamp())
    }

    /// Verifies signature, issuer, audience and expiry against `now`.
    pub fn validate_at(&self, token: &str, now: i64) -> Result<JoinClaims, AuthError> {
        let mut validation = self.validation();
        validation.set_audience(&[self.config.audience.as_str()]);
        validation.set_issuer(&[self.config.issuer.as_str()]);

        let claims: JoinClaims = self.verify(token, &validation)?;
        if claims.exp <= now {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against an explicit clock after decoding.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    fn verify<T: DeserializeOwned>(
        &self,
        token: &str,
        validation: &Validation,
    ) -> Result<T, AuthError> {
        decode::<T>(token, &self.decoding_key, validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::Invalid(e.to_string()))
    }
}
