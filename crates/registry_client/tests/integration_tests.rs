//! Client, join coordinator and session hooks against a live registry server.

use async_trait::async_trait;
use registry_client::{
    CatalogError, ClientConfig, ClientError, HookError, JoinCoordinator, JoinError,
    RegistryClient, SessionHooks, WorldCatalog, WorldRecord,
};
use registry_core::auth::{AuthConfig, JoinAuthority};
use registry_core::{
    current_timestamp, InstanceRegistry, InstanceType, MemoryStore, Platform, RegistryConfig,
};
use registry_server::{RegistryServer, ServerConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const SECRET: &str = "client-test-secret";

struct Harness {
    client: Arc<RegistryClient>,
    base_url: String,
    shutdown: CancellationToken,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn harness() -> Harness {
    let registry = Arc::new(InstanceRegistry::new(
        Arc::new(MemoryStore::new()),
        RegistryConfig::default(),
    ));
    let server = RegistryServer::new(
        ServerConfig {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            shared_secret: SECRET.into(),
        },
        registry,
    );
    let listener = server.bind().await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let shutdown = CancellationToken::new();
    tokio::spawn(server.serve(listener, shutdown.clone()));

    let client = RegistryClient::new(ClientConfig {
        base_url: base_url.clone(),
        shared_secret: SECRET.into(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    Harness {
        client: Arc::new(client),
        base_url,
        shutdown,
    }
}

struct StaticCatalog(HashMap<String, WorldRecord>);

impl StaticCatalog {
    fn with(worlds: &[(&str, u32)]) -> Arc<dyn WorldCatalog> {
        let worlds = worlds
            .iter()
            .map(|(id, capacity)| {
                (
                    id.to_string(),
                    WorldRecord {
                        world_id: id.to_string(),
                        author_id: "usr_author".into(),
                        name: format!("World {id}"),
                        tags: vec!["social".into()],
                        capacity: *capacity,
                    },
                )
            })
            .collect();
        Arc::new(StaticCatalog(worlds))
    }
}

#[async_trait]
impl WorldCatalog for StaticCatalog {
    async fn world(&self, world_id: &str) -> Result<Option<WorldRecord>, CatalogError> {
        Ok(self.0.get(world_id).cloned())
    }
}

fn authority() -> Arc<JoinAuthority> {
    Arc::new(
        JoinAuthority::new(AuthConfig {
            signing_secret: "join-signing-secret".into(),
            ..AuthConfig::default()
        })
        .unwrap(),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn test_typed_results() {
    let h = harness().await;
    let client = &h.client;

    assert!(client.get("wrld_X:1").await.unwrap().is_none());

    let instance = client.register("wrld_X:1", 4).await.unwrap();
    assert_eq!(instance.world_id, "wrld_X");
    assert_eq!(client.get("wrld_X:1").await.unwrap().unwrap().id, "wrld_X:1");

    client.add_player("wrld_X:1", "usr_A", Some(Platform::Pc)).await.unwrap();
    client.add_player("wrld_X:1", "usr_B", None).await.unwrap();
    let instance = client.get("wrld_X:1").await.unwrap().unwrap();
    assert_eq!(instance.player_count.total, 2);
    assert_eq!(instance.player_count.pc, 1);

    let by_player = client.find_by_player("usr_A").await.unwrap();
    assert_eq!(by_player.len(), 1);

    let page = client
        .find_by_world("wrld_X", InstanceType::Public, false)
        .await
        .unwrap();
    assert_eq!(page.instances.len(), 1);
    assert!(!page.paging_supported);

    assert!(matches!(
        client.remove_player("wrld_X:1", "usr_Z", None).await,
        Err(ClientError::NotAMember(_))
    ));
    assert!(matches!(
        client.ping("wrld_X:404").await,
        Err(ClientError::NotFound(_))
    ));
    assert!(matches!(
        client.register("garbage", 4).await,
        Err(ClientError::BadRequest(_))
    ));

    let reconciled = client.reconcile("wrld_X:1").await.unwrap();
    assert_eq!(reconciled.player_count.total, 2);

    assert!(client.unregister("wrld_X:1").await.unwrap());
    assert!(!client.unregister("wrld_X:1").await.unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wrong_secret_is_unauthorized() {
    let h = harness().await;
    let client = RegistryClient::new(ClientConfig {
        base_url: h.base_url.clone(),
        shared_secret: "wrong".into(),
        ..ClientConfig::default()
    })
    .unwrap();

    assert!(matches!(
        client.get("wrld_X:1").await,
        Err(ClientError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_transport_failure_is_not_not_found() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RegistryClient::new(ClientConfig {
        base_url: format!("http://{addr}"),
        shared_secret: SECRET.into(),
        timeout: Duration::from_secs(2),
    })
    .unwrap();

    assert!(matches!(
        client.get("wrld_X:1").await,
        Err(ClientError::Transport(_))
    ));
}

#[tokio::test]
async fn test_timeouts() {
    // Accepts connections and never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let client = RegistryClient::new(ClientConfig {
        base_url: format!("http://{addr}"),
        shared_secret: SECRET.into(),
        timeout: Duration::from_millis(200),
    })
    .unwrap();

    assert!(matches!(
        client.get("wrld_X:1").await,
        Err(ClientError::Timeout)
    ));
    assert!(matches!(
        client.add_player("wrld_X:1", "usr_A", None).await,
        Err(ClientError::PartialFailure(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_join_then_session_hooks() {
    let h = harness().await;
    let authority = authority();
    let coordinator = JoinCoordinator::new(
        h.client.clone(),
        StaticCatalog::with(&[("wrld_X", 8)]),
        authority.clone(),
    );
    let hooks = SessionHooks::new(h.client.clone(), authority.clone());

    let ticket = coordinator
        .request_join("usr_A", "wrld_X:77~friends(usr_o)~region(eu)", "10.0.0.1")
        .await
        .unwrap();
    assert_eq!(ticket.instance.capacity, 8);
    assert_eq!(ticket.instance.instance_type, InstanceType::Friends);
    assert_eq!(ticket.location.region, "eu");

    assert!(matches!(
        hooks.player_joined(&ticket.token, "10.9.9.9", None).await,
        Err(HookError::AddressMismatch)
    ));

    let claims = hooks
        .player_joined(&ticket.token, "10.0.0.1", Some(Platform::Android))
        .await
        .unwrap();
    assert_eq!(claims.sub, "usr_A");
    assert_eq!(claims.instance_owner_id, "usr_o");
    assert_eq!(claims.world_name, "World wrld_X");

    let id = "wrld_X:77~friends(usr_o)~region(eu)";
    let instance = h.client.get(id).await.unwrap().unwrap();
    assert_eq!(instance.players, vec!["usr_A"]);
    assert_eq!(instance.player_count.android, 1);

    hooks.keep_alive(id).await.unwrap();
    hooks
        .player_left(id, "usr_A", Some(Platform::Android))
        .await
        .unwrap();
    assert!(h.client.get(id).await.unwrap().unwrap().players.is_empty());

    hooks.room_closed(id).await.unwrap();
    hooks.room_closed(id).await.unwrap();
    assert!(h.client.get(id).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_join_rejections() {
    let h = harness().await;
    let coordinator = JoinCoordinator::new(
        h.client.clone(),
        StaticCatalog::with(&[("wrld_S", 1)]),
        authority(),
    );

    assert!(matches!(
        coordinator.request_join("usr_A", "no-separator", "1.1.1.1").await,
        Err(JoinError::MalformedLocation(_))
    ));
    assert!(matches!(
        coordinator.request_join("usr_A", "wrld_missing:1", "1.1.1.1").await,
        Err(JoinError::UnknownWorld(_))
    ));

    coordinator
        .request_join("usr_A", "wrld_S:1", "1.1.1.1")
        .await
        .unwrap();
    h.client.add_player("wrld_S:1", "usr_A", None).await.unwrap();
    assert!(matches!(
        coordinator.request_join("usr_B", "wrld_S:1", "1.1.1.2").await,
        Err(JoinError::InstanceFull(_))
    ));
    // Rejoining members are not turned away by a full instance.
    assert!(coordinator
        .request_join("usr_A", "wrld_S:1", "1.1.1.1")
        .await
        .is_ok());

    h.client
        .block_player("wrld_S:1", "usr_A", current_timestamp() + 600)
        .await
        .unwrap();
    assert!(matches!(
        coordinator.request_join("usr_A", "wrld_S:1", "1.1.1.1").await,
        Err(JoinError::Blocked { .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_join_does_not_reset_a_live_instance() {
    let h = harness().await;
    let coordinator = JoinCoordinator::new(
        h.client.clone(),
        StaticCatalog::with(&[("wrld_L", 8)]),
        authority(),
    );

    let first = coordinator
        .request_join("usr_A", "wrld_L:1", "1.1.1.1")
        .await
        .unwrap();
    h.client.add_player("wrld_L:1", "usr_A", None).await.unwrap();

    let second = coordinator
        .request_join("usr_B", "wrld_L:1", "1.1.1.2")
        .await
        .unwrap();
    assert_eq!(second.instance.players, vec!["usr_A"]);
    assert!(second.instance.last_activity >= first.instance.last_activity);

    let instance = h.client.get("wrld_L:1").await.unwrap().unwrap();
    assert_eq!(instance.players, vec!["usr_A"]);
    assert_eq!(instance.player_count.total, 1);
}
