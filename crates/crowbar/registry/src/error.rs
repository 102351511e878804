//! Registry error types

use crowbar_types::{BarclampId, DeploymentId, OwnershipError, SnapshotId, TemplateId};
use thiserror::Error;

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Barclamp not found: {0}")]
    BarclampNotFound(BarclampId),

    #[error("Template not found: {0}")]
    TemplateNotFound(TemplateId),

    #[error("Deployment not found: {0}")]
    DeploymentNotFound(DeploymentId),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(SnapshotId),

    #[error("Barclamp already exists: {0}")]
    BarclampAlreadyExists(String),

    #[error("Deployment name {name:?} already used in {barclamp_id}")]
    DuplicateDeploymentName {
        barclamp_id: BarclampId,
        name: String,
    },

    #[error("{barclamp_id} allows a single deployment and already has one")]
    ExclusiveDeployment { barclamp_id: BarclampId },

    #[error("Foreign snapshot: {0}")]
    ForeignSnapshot(#[from] OwnershipError),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
