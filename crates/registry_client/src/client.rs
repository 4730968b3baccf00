//! Typed HTTP client for the instance registry.

use crate::config::ClientConfig;
use crate::error::ClientError;
use registry_core::wire::{
    AckResponse, ErrorCode, ErrorResponse, PlayerInstancesResponse, UnregisterResponse,
    WorldInstancesResponse,
};
use registry_core::{Instance, InstanceType, Location, Platform};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

/// Remote handle to a registry server.
///
/// Cheap to share behind an `Arc`; the underlying connection pool is reused
/// across calls.
pub struct RegistryClient {
    http: reqwest::Client,
    base: Url,
    config: ClientConfig,
}

/// Whether a call changes registry state. A mutation that times out may
/// still have landed, so it is reported as a partial failure.
#[derive(Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Read,
    Mutation,
}

impl RegistryClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(config.base_url.clone()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self { http, base, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Appends percent-encoded path segments to the base url.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.config.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        Ok(self
            .http
            .request(method, self.url(segments)?)
            .bearer_auth(&self.config.shared_secret))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        kind: CallKind,
    ) -> Result<T, ClientError> {
        let response = request.send().await.map_err(|e| transport_error(e, kind))?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ClientError::Decode(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorResponse>(&body).ok();
        Err(status_error(status, parsed, body))
    }

    /// Fetches one instance; `Ok(None)` when it does not exist.
    pub async fn get(&self, id: &str) -> Result<Option<Instance>, ClientError> {
        match self
            .send(self.request(Method::GET, &[id])?, CallKind::Read)
            .await
        {
            Ok(instance) => Ok(Some(instance)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn find_by_world(
        &self,
        world_id: &str,
        instance_type: InstanceType,
        include_full: bool,
    ) -> Result<WorldInstancesResponse, ClientError> {
        let request = self
            .request(Method::GET, &["world", world_id])?
            .query(&[("type", instance_type.as_str())])
            .query(&[("includeFull", include_full)]);
        self.send(request, CallKind::Read).await
    }

    pub async fn find_by_player(&self, user_id: &str) -> Result<Vec<Instance>, ClientError> {
        let response: PlayerInstancesResponse = self
            .send(self.request(Method::GET, &["player", user_id])?, CallKind::Read)
            .await?;
        Ok(response.instances)
    }

    /// Registers (or re-registers) an instance. The id must be a full
    /// location string; the server derives world, type and owner from it.
    pub async fn register(&self, id: &str, capacity: u32) -> Result<Instance, ClientError> {
        let request = self
            .request(Method::POST, &["register", id])?
            .query(&[("capacity", capacity)]);
        self.send(request, CallKind::Mutation).await
    }

    pub async fn register_location(
        &self,
        location: &Location,
        capacity: u32,
    ) -> Result<Instance, ClientError> {
        self.register(&location.full(), capacity).await
    }

    /// Registers the instance unless it already exists. The returned
    /// document is the existing one when nothing was written.
    pub async fn register_location_if_absent(
        &self,
        location: &Location,
        capacity: u32,
    ) -> Result<Instance, ClientError> {
        let request = self
            .request(Method::POST, &["register", &location.full()])?
            .query(&[("capacity", capacity)])
            .query(&[("ifAbsent", true)]);
        self.send(request, CallKind::Mutation).await
    }

    pub async fn ping(&self, id: &str) -> Result<(), ClientError> {
        let _: AckResponse = self
            .send(self.request(Method::POST, &["ping", id])?, CallKind::Mutation)
            .await?;
        Ok(())
    }

    /// Returns whether an instance was actually removed.
    pub async fn unregister(&self, id: &str) -> Result<bool, ClientError> {
        let response: UnregisterResponse = self
            .send(self.request(Method::POST, &["unregister", id])?, CallKind::Mutation)
            .await?;
        Ok(response.removed)
    }

    pub async fn add_player(
        &self,
        id: &str,
        user_id: &str,
        platform: Option<Platform>,
    ) -> Result<(), ClientError> {
        let request = with_platform(self.request(Method::PUT, &["player", id, user_id])?, platform);
        let _: AckResponse = self.send(request, CallKind::Mutation).await?;
        debug!("Added {} to {}", user_id, id);
        Ok(())
    }

    pub async fn remove_player(
        &self,
        id: &str,
        user_id: &str,
        platform: Option<Platform>,
    ) -> Result<(), ClientError> {
        let request =
            with_platform(self.request(Method::DELETE, &["player", id, user_id])?, platform);
        let _: AckResponse = self.send(request, CallKind::Mutation).await?;
        debug!("Removed {} from {}", user_id, id);
        Ok(())
    }

    pub async fn block_player(
        &self,
        id: &str,
        user_id: &str,
        blocked_until: i64,
    ) -> Result<(), ClientError> {
        let request = self
            .request(Method::PUT, &["block", id, user_id])?
            .query(&[("until", blocked_until)]);
        let _: AckResponse = self.send(request, CallKind::Mutation).await?;
        Ok(())
    }

    pub async fn reconcile(&self, id: &str) -> Result<Instance, ClientError> {
        self.send(self.request(Method::POST, &["reconcile", id])?, CallKind::Mutation)
            .await
    }
}

fn with_platform(request: RequestBuilder, platform: Option<Platform>) -> RequestBuilder {
    match platform {
        Some(platform) => request.query(&[("platform", platform.as_str())]),
        None => request,
    }
}

fn transport_error(e: reqwest::Error, kind: CallKind) -> ClientError {
    if !e.is_timeout() {
        return ClientError::Transport(e.to_string());
    }
    match kind {
        CallKind::Read => ClientError::Timeout,
        CallKind::Mutation => {
            error!("Registry mutation timed out; outcome unknown");
            ClientError::PartialFailure("request timed out; outcome unknown".into())
        }
    }
}

fn status_error(status: StatusCode, parsed: Option<ErrorResponse>, body: String) -> ClientError {
    let code = parsed.as_ref().map(|e| e.error);
    let message = parsed.map(|e| e.message).unwrap_or(body);

    match (status, code) {
        (StatusCode::UNAUTHORIZED, _) => ClientError::Unauthorized,
        (StatusCode::NOT_FOUND, Some(ErrorCode::NotAMember)) => ClientError::NotAMember(message),
        (StatusCode::NOT_FOUND, _) => ClientError::NotFound(message),
        (StatusCode::BAD_REQUEST, _) => ClientError::BadRequest(message),
        (_, Some(ErrorCode::PartialFailure)) => ClientError::PartialFailure(message),
        _ => ClientError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> RegistryClient {
        RegistryClient::new(ClientConfig {
            base_url: base_url.into(),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_segments_are_encoded() {
        let client = client("http://registry.local:8085");
        let url = client
            .url(&["player", "wrld_X:1~private(usr_1)", "usr 2/evil"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://registry.local:8085/player/wrld_X:1~private(usr_1)/usr%202%2Fevil"
        );
    }

    #[test]
    fn test_base_path_is_kept() {
        let client = client("http://registry.local/api/");
        assert_eq!(
            client.url(&["ping", "wrld_X:1"]).unwrap().as_str(),
            "http://registry.local/api/ping/wrld_X:1"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            RegistryClient::new(ClientConfig {
                base_url: "not a url".into(),
                ..ClientConfig::default()
            }),
            Err(ClientError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_status_mapping() {
        let body = |error, message: &str| {
            Some(ErrorResponse {
                error,
                message: message.into(),
            })
        };
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, body(ErrorCode::NotFound, "gone"), String::new()),
            ClientError::NotFound(_)
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, body(ErrorCode::NotAMember, "who"), String::new()),
            ClientError::NotAMember(_)
        ));
        assert!(matches!(
            status_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                body(ErrorCode::PartialFailure, "drift"),
                String::new()
            ),
            ClientError::PartialFailure(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, None, "upstream".into()),
            ClientError::Server { status: 502, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, None, String::new()),
            ClientError::Unauthorized
        ));
    }
}
