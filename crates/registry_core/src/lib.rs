//! # Registry Core - Instance Discovery
//!
//! The domain layer of the Horizon instance registry: a small, highly
//! concurrent service that tracks which multiplayer session instances exist,
//! who is in each one and how full each one is.
//!
//! ## Components
//!
//! * [`location`] - Parser for composite instance identifiers
//! * [`store`] - Store primitives and the in-memory indexed store
//! * [`registry`] - [`InstanceRegistry`], the registry operations over a store
//! * [`reaper`] - Background removal of abandoned instances
//! * [`auth`] - Signed join tokens and simple handshake tokens
//! * [`wire`] - Response bodies shared by the HTTP server and client
//!
//! ## Consistency Model
//!
//! There is no in-process lock around registry data. Every membership change
//! is a short sequence of single-document store primitives (array append or
//! remove, counter increment, activity touch). Each primitive is atomic, the
//! sequence is not. A sequence that stops part way through is reported as
//! [`RegistryError::PartialFailure`] and repaired with
//! [`InstanceRegistry::reconcile`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use registry_core::{InstanceRegistry, Location, MemoryStore, RegistryConfig};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), registry_core::RegistryError> {
//! let registry = InstanceRegistry::new(Arc::new(MemoryStore::new()), RegistryConfig::default());
//! let location = Location::parse("wrld_abc:12345~friends(usr_1)")?;
//! let instance = registry.register_location(&location, 16).await?;
//! registry.add_player(&instance.id, "usr_2", None).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod error;
pub mod instance;
pub mod location;
pub mod reaper;
pub mod registry;
pub mod store;
pub mod utils;
pub mod wire;

pub use auth::{AuthConfig, AuthError, JoinAuthority, JoinClaims, JoinGrant};
pub use error::{MutationStep, RegistryError, StoreError};
pub use instance::{BlockedPlayer, Instance, Platform, PlayerCount, Registration};
pub use location::{InstanceType, Location, LocationError};
pub use reaper::{Reaper, ReaperConfig, SweepReport};
pub use registry::{InstanceRegistry, RegistryConfig, WorldPage, DEFAULT_PAGE_SIZE};
pub use store::{InstanceStore, MemoryStore};
pub use utils::current_timestamp;
