//! Crowbar Registry - Storage traits and implementations
//!
//! This crate provides the persistence layer for the deployment model:
//!
//! - **BarclampRegistry**: Stores imported barclamps and their templates
//! - **DeploymentRegistry**: Stores deployments and the snapshots they own
//!
//! ## Constraints
//!
//! Uniqueness and exclusivity are enforced here, at insert time, rather than
//! by a separate pre-check in the caller. Two concurrent inserts of the same
//! deployment name under one barclamp cannot both succeed.
//!
//! ## In-Memory vs Persistent
//!
//! The crate provides in-memory implementations suitable for development and
//! testing. Persistent backends implement the same traits and must provide
//! the same constraints (unique indexes, transactional proposal insert).

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod barclamp;
pub mod deployment;
pub mod error;
pub mod memory;

// Re-exports
pub use barclamp::BarclampRegistry;
pub use deployment::DeploymentRegistry;
pub use error::{RegistryError, Result};
pub use memory::{InMemoryBarclampRegistry, InMemoryDeploymentRegistry};
