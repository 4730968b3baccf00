use super::{AuthError, JoinAuthority, SimpleClaims, TokenKind};
use crate::utils::current_timestamp;
use std::time::Duration;

impl JoinAuthority {
    pub fn issue_simple(
        &self,
        user_id: &str,
        ip: &str,
        client_token: bool,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        self.issue_simple_at(user_id, ip, client_token, ttl, current_timestamp())
    }

    pub fn issue_simple_at(
        &self,
        user_id: &str,
        ip: &str,
        client_token: bool,
        ttl: Duration,
        now: i64,
    ) -> Result<String, AuthError> {
        let claims = SimpleClaims {
            sub: user_id.to_string(),
            ip: ip.to_string(),
            kind: TokenKind::from_client_flag(client_token),
            iat: now,
            exp: now + ttl.as_secs() as i64,
        };
        self.sign(&claims)
    }

    /// Checks a simple token and returns the user id it was minted for.
    ///
    /// The token kind must always match `expect_client_token`. The address
    /// binding is skipped only when `bypass_ip_check` is set, which is the
    /// server-to-server mode.
    pub fn validate_simple(
        &self,
        token: &str,
        ip: &str,
        expect_client_token: bool,
        bypass_ip_check: bool,
    ) -> Result<String, AuthError> {
        self.validate_simple_at(token, ip, expect_client_token, bypass_ip_check, current_timestamp())
    }

    pub fn validate_simple_at(
        &self,
        token: &str,
        ip: &str,
        expect_client_token: bool,
        bypass_ip_check: bool,
        now: i64,
    ) -> Result<String, AuthError> {
        let mut validation = self.validation();
        validation.validate_aud = false;

        let claims: SimpleClaims = self.verify(token, &validation)?;
        if claims.exp <= now {
            return Err(AuthError::Expired);
        }

        let expected = TokenKind::from_client_flag(expect_client_token);
        if claims.kind != expected {
            return Err(AuthError::WrongKind { expected });
        }
        if !bypass_ip_check && claims.ip != ip {
            return Err(AuthError::IpMismatch);
        }
        Ok(claims.sub)
    }
}
