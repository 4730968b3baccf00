//! # Registry Server - HTTP Surface
//!
//! Exposes an [`InstanceRegistry`](registry_core::InstanceRegistry) to
//! out-of-process callers: the API service that handles join requests and the
//! session-authority callback hooks that report membership changes.
//!
//! ## Endpoints
//!
//! | Operation | Route |
//! |---|---|
//! | Get instance | `GET /{instanceId}` |
//! | Instances for world | `GET /world/{worldId}?type=&includeFull=` |
//! | Register | `POST /register/{instanceId}?capacity=N[&ifAbsent=true]` |
//! | Ping | `POST /ping/{instanceId}` |
//! | Unregister | `POST /unregister/{instanceId}` |
//! | Instances for player | `GET /player/{playerId}` |
//! | Add player | `PUT /player/{instanceId}/{playerId}?platform=` |
//! | Remove player | `DELETE /player/{instanceId}/{playerId}?platform=` |
//! | Block player | `PUT /block/{instanceId}/{playerId}?until=` |
//! | Reconcile counts | `POST /reconcile/{instanceId}` |
//!
//! Every route requires the shared secret, either as an
//! `Authorization: Bearer` header or a `?secret=` query parameter.
//!
//! ## Error Handling
//!
//! Handlers return [`ApiError`], which renders as a JSON
//! [`ErrorResponse`](registry_core::wire::ErrorResponse):
//!
//! * **404** - instance absent, or the user is not a member
//! * **400** - malformed location, invalid registration or bad query
//! * **401** - missing or wrong shared secret
//! * **500** - partial failures and store faults, without store details
//!
//! Server lifecycle failures use [`ServerError`].

pub use config::ServerConfig;
pub use error::{ApiError, ServerError};
pub use server::RegistryServer;

pub mod config;
pub mod error;
pub mod logging;
pub mod server;
