//! Resource lifecycle layer
//!
//! This module provides a data-driven approach to managing cloud resources.
//! Resource type definitions are loaded from JSON files at compile time, so
//! a new resource type only needs a definition, not new code.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches resource type definitions from embedded JSON
//! - [`model`] - Canonical attribute-map representation of a resource
//! - [`codec`] - Maps canonical attributes to and from the service wire schema
//! - [`filter`] - Decides between server-side and client-side filtering
//! - [`translate`] - Converts transport outcomes into [`CloudError`](crate::error::CloudError)
//! - [`lifecycle`] - List/get/create/update/delete orchestration
//!
//! # Example
//!
//! ```ignore
//! use cloudlayer::resource::{CloudClient, CreateRequest, Filter};
//!
//! async fn example(client: &CloudClient) -> cloudlayer::Result<()> {
//!     let nets = client.list_networks(Some(&Filter::new().with("name", "test"))).await?;
//!     client.create_network(CreateRequest::new("netname").external(true)).await?;
//!     let deleted = client.delete_network("netname").await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod filter;
pub mod lifecycle;
pub mod model;
pub mod registry;
pub mod translate;

pub use codec::{CreateRequest, ProviderOptions};
pub use filter::Filter;
pub use lifecycle::{CloudClient, ResourceClient};
pub use model::{Attributes, Resource};
pub use registry::{find_resource, get_all_resource_keys, get_resource, ResourceDef};
