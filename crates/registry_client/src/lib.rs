//! # Registry Client
//!
//! Remote access to the instance registry for the two kinds of out-of-process
//! callers:
//!
//! * the API service, which resolves join requests through
//!   [`JoinCoordinator`]
//! * the session authority, which reports membership and room lifecycle
//!   through [`SessionHooks`]
//!
//! Both sit on top of [`RegistryClient`], a typed RPC facade over the
//! registry's HTTP surface. Every call returns a [`ClientError`] variant per
//! failure mode; "not found" is only ever reported when the registry said so.

pub mod client;
pub mod config;
pub mod error;
pub mod hooks;
pub mod join;

pub use client::RegistryClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use hooks::{HookError, SessionHooks};
pub use join::{CatalogError, JoinCoordinator, JoinError, JoinTicket, WorldCatalog, WorldRecord};
