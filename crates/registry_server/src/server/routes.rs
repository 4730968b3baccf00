//! Route table and handlers.
//!
//! Handlers only translate between HTTP and [`InstanceRegistry`] calls. Path
//! and query validation happens before any registry call is made.

use super::auth::require_secret;
use super::AppState;
use crate::error::ApiError;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{middleware, Json, Router};
use registry_core::wire::{
    AckResponse, PlayerInstancesResponse, UnregisterResponse, WorldInstancesResponse,
};
use registry_core::{Instance, InstanceRegistry, InstanceType, Location, Platform, RegistryError};
use serde::Deserialize;
use tracing::debug;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorldParams {
    #[serde(rename = "type")]
    instance_type: Option<InstanceType>,
    #[serde(default)]
    include_full: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterParams {
    capacity: Option<u32>,
    /// Keep an existing document instead of resetting it
    #[serde(default)]
    if_absent: bool,
}

#[derive(Debug, Deserialize)]
struct PlatformParams {
    platform: Option<Platform>,
}

#[derive(Debug, Deserialize)]
struct BlockParams {
    until: Option<i64>,
}

fn params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/world/:id", get(world_instances))
        .route("/register/:id", post(register))
        .route("/ping/:id", post(ping))
        .route("/unregister/:id", post(unregister))
        .route("/reconcile/:id", post(reconcile))
        .route("/player/:id", get(player_instances))
        .route("/player/:id/:player", put(add_player).delete(remove_player))
        .route("/block/:id/:player", put(block_player))
        .route("/:id", get(get_instance))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_secret))
        .with_state(state)
}

fn registry(state: &AppState) -> &InstanceRegistry {
    &state.registry
}

async fn get_instance(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Instance> {
    Ok(Json(registry(&state).get(&id).await?))
}

async fn world_instances(
    State(state): State<AppState>,
    Path(world_id): Path<String>,
    query: Result<Query<WorldParams>, QueryRejection>,
) -> ApiResult<WorldInstancesResponse> {
    let params = params(query)?;
    let page = registry(&state)
        .find_by_world(
            &world_id,
            params.instance_type.unwrap_or_default(),
            params.include_full,
        )
        .await?;

    Ok(Json(WorldInstancesResponse {
        instances: page.instances,
        truncated: page.truncated,
        paging_supported: false,
    }))
}

async fn register(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<RegisterParams>, QueryRejection>,
) -> ApiResult<Instance> {
    let location = Location::parse(&id)?;
    let params = params(query)?;
    let capacity = params
        .capacity
        .ok_or_else(|| ApiError::BadRequest("capacity is required".into()))?;

    let registry = registry(&state);
    let instance = if params.if_absent {
        registry.register_location_if_absent(&location, capacity).await?
    } else {
        registry.register_location(&location, capacity).await?
    };
    Ok(Json(instance))
}

async fn ping(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<AckResponse> {
    registry(&state).ping(&id).await?;
    Ok(Json(AckResponse::ok(id)))
}

async fn unregister(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<UnregisterResponse> {
    let removed = match registry(&state).unregister(&id).await {
        Ok(()) => true,
        Err(RegistryError::NotFound(_)) => {
            debug!("Unregister of absent instance {}", id);
            false
        }
        Err(e) => return Err(e.into()),
    };
    Ok(Json(UnregisterResponse { id, removed }))
}

async fn reconcile(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Instance> {
    Ok(Json(registry(&state).reconcile(&id).await?))
}

async fn player_instances(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> ApiResult<PlayerInstancesResponse> {
    let instances = registry(&state).find_by_player(&player_id).await?;
    Ok(Json(PlayerInstancesResponse {
        player_id,
        instances,
    }))
}

async fn add_player(
    State(state): State<AppState>,
    Path((id, player)): Path<(String, String)>,
    query: Result<Query<PlatformParams>, QueryRejection>,
) -> ApiResult<AckResponse> {
    let platform = params(query)?.platform;
    registry(&state).add_player(&id, &player, platform).await?;
    Ok(Json(AckResponse::ok(id)))
}

async fn remove_player(
    State(state): State<AppState>,
    Path((id, player)): Path<(String, String)>,
    query: Result<Query<PlatformParams>, QueryRejection>,
) -> ApiResult<AckResponse> {
    let platform = params(query)?.platform;
    registry(&state)
        .remove_player(&id, &player, platform)
        .await?;
    Ok(Json(AckResponse::ok(id)))
}

async fn block_player(
    State(state): State<AppState>,
    Path((id, player)): Path<(String, String)>,
    query: Result<Query<BlockParams>, QueryRejection>,
) -> ApiResult<AckResponse> {
    let until = params(query)?
        .until
        .ok_or_else(|| ApiError::BadRequest("until is required".into()))?;
    registry(&state).block_player(&id, &player, until).await?;
    Ok(Json(AckResponse::ok(id)))
}
