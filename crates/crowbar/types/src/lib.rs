//! Crowbar Types - Core types for the barclamp deployment model
//!
//! Crowbar manages cluster configuration as barclamps: deployable feature
//! bundles that each own a template and zero or more named deployments.
//!
//! ## Key Concepts
//!
//! - **Barclamp**: An importable bundle with a role catalog and a template
//! - **Template**: The canonical, undeployed ordered role list of a barclamp
//! - **Deployment**: A named instantiation of a template
//! - **Snapshot**: A point-in-time configuration of a deployment with a
//!   lifecycle status
//! - **Active snapshot**: The snapshot a deployment's status is derived from
//!
//! Everything here is plain data plus the invariants that can be checked
//! locally (name syntax, snapshot ownership, the status transition table).
//! Cross-entity constraints live in `crowbar-registry`.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod barclamp;
pub mod deployment;
pub mod events;
pub mod ids;
pub mod name;
pub mod role;
pub mod snapshot;
pub mod template;

// Re-export main types
pub use barclamp::{Barclamp, BarclampDefinition, RoleDefinition};
pub use deployment::{Deployment, OwnershipError};
pub use events::{CrowbarEvent, CrowbarEventEnvelope, EventSeverity, EventSource};
pub use ids::{BarclampId, DeploymentId, RoleId, RoleTypeId, SnapshotId, TemplateId};
pub use name::{DeploymentName, NameError, NameRule};
pub use role::{CatalogError, RoleCatalog, RoleEntry, RoleList, RoleType};
pub use snapshot::{LifecycleState, Snapshot, SnapshotStatus, TransitionError, TransitionMode};
pub use template::Template;
