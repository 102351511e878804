//! Crowbar Deployment - Barclamp deployment model
//!
//! Imports barclamps, turns templates into proposals and tracks each
//! deployment's snapshots through their commit lifecycle.
//!
//! ## Architectural Boundaries
//!
//! - `crowbar-types` owns: records, name rules, role ordering, the snapshot
//!   transition table
//! - `crowbar-registry` owns: storage and the constraints that must hold
//!   under concurrent writers
//! - `crowbar-deployment` owns: command sequencing, policy (single vs.
//!   multiple deployments), definition loading, localized defaults, events
//!
//! ## Usage
//!
//! ```no_run
//! use crowbar_deployment::{BarclampManager, ManagerConfig, StaticDefinitionLoader};
//! use crowbar_types::{BarclampDefinition, SnapshotStatus};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = StaticDefinitionLoader::new().with(
//!     BarclampDefinition::new("database")
//!         .with_role("private", 0, 0)
//!         .with_role("server", 10, 10),
//! );
//! let manager = BarclampManager::in_memory(&ManagerConfig::default(), Arc::new(loader));
//!
//! let barclamp = manager.import("database", None, None).await?;
//! if let Some(deployment) = manager.create_proposal(&barclamp.id, None).await? {
//!     if let Some(snapshot_id) = &deployment.proposed_snapshot_id {
//!         manager.set_active_snapshot(&deployment.id, snapshot_id).await?;
//!         manager.transition(snapshot_id, SnapshotStatus::Queued).await?;
//!     }
//!     println!("{}", manager.status(&deployment.id).await?);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod config;
pub mod error;
pub mod loader;
pub mod locale;
mod lock;
pub mod manager;

// Re-exports
pub use config::{ConfigError, LocaleConfig, ManagerConfig};
pub use error::{CrowbarError, ErrorKind, Result};
pub use loader::{
    DefinitionLoader, FileDefinitionLoader, LoadedDefinition, LoaderError, StaticDefinitionLoader,
};
pub use locale::{Localizer, StaticLocalizer, DEFAULT_DEPLOYMENT_KEY};
pub use manager::BarclampManager;
