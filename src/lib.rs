//! # cloudlayer
//!
//! One consistent, idempotent resource-management interface over
//! OpenStack-style service APIs.
//!
//! A logical operation ("create network X", "delete network named Y",
//! "list networks matching F") goes through the lifecycle engine, which
//! plans filtering, assembles wire bodies, drives a pluggable
//! [`Transport`](transport::Transport) and translates failures into a
//! single [`CloudError`].
//!
//! ## Modules
//!
//! - [`resource`] - Registry, codec, filter engine and lifecycle engine
//! - [`transport`] - Transport trait with HTTP, scripted and in-memory implementations
//! - [`config`] - Cloud profiles loaded from `clouds.yaml`
//! - [`error`] - Error taxonomy

pub mod config;
pub mod error;
pub mod resource;
pub mod transport;

pub use error::{CloudError, ErrorKind, Result, TransportError};
pub use resource::{CloudClient, CreateRequest, Filter, Resource};
