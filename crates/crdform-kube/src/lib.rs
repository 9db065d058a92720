//! crdform Kube - cluster side of crdform
//!
//! This crate provides:
//! - **Dynamic Client**: GET / server-side apply / DELETE for any custom resource
//! - **Resource Adapter**: create, read, update, delete and import driven by a descriptor
//! - **Data Sources**: read-only lookups of existing objects
//! - **Wait Conditions**: JSONPath polling after apply
//! - **Provider**: registry of descriptors, shared connection and schema export
//! - **Mock Client**: in-memory server-side apply for tests

pub mod adapter;
pub mod client;
pub mod config;
pub mod connection;
pub mod data_source;
pub mod error;
pub mod mock;
pub mod provider;
pub mod registry;
pub mod wait;

pub use adapter::ResourceAdapter;
pub use client::{ApplyParams, DynamicClient, KubeDynamicClient, ObjectRef};
pub use config::ProviderConfig;
pub use connection::ProviderConnection;
pub use data_source::DataSourceAdapter;
pub use error::{KubeError, Result};
pub use mock::{MockDynamicClient, OperationCounts};
pub use provider::{MANIFEST_SUFFIX, Provider, ProviderSchema};
pub use registry::Registry;
pub use wait::{JsonPath, Waiter};
