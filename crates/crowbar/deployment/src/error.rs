//! Manager error types
//!
//! Every failure surfaced by [`BarclampManager`](crate::BarclampManager)
//! carries an [`ErrorKind`] so callers can map it to a response without
//! looking at storage details.

use crate::loader::LoaderError;
use crowbar_registry::RegistryError;
use crowbar_types::{
    BarclampId, CatalogError, DeploymentId, NameError, OwnershipError, RoleTypeId, SnapshotId,
    SnapshotStatus, TemplateId, TransitionError,
};
use thiserror::Error;

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input rejected before anything was stored
    Validation,
    /// A referenced record does not exist
    NotFound,
    /// The request contradicts current state
    Conflict,
    /// Definition loading failed
    Loader,
    /// Storage or invariant failure
    Internal,
}

/// Manager errors
#[derive(Debug, Error)]
pub enum CrowbarError {
    #[error("Invalid name: {0}")]
    InvalidName(#[from] NameError),

    #[error("Deployment name {name:?} already used in {barclamp_id}")]
    DuplicateName {
        barclamp_id: BarclampId,
        name: String,
    },

    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    #[error("Barclamp not found: {0}")]
    BarclampNotFound(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(TemplateId),

    #[error("Deployment not found: {0}")]
    DeploymentNotFound(DeploymentId),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(SnapshotId),

    #[error("Unknown role type: {0}")]
    UnknownRole(String),

    #[error("Role type {0} is not in the role list")]
    RoleNotInList(RoleTypeId),

    #[error("Role {0} is already in the role list")]
    RoleAlreadyInList(String),

    #[error("{0} allows a single deployment and already has one")]
    SingleDeployment(BarclampId),

    #[error("{0}")]
    IllegalTransition(#[from] TransitionError),

    #[error("Foreign snapshot: {0}")]
    ForeignSnapshot(#[from] OwnershipError),

    #[error("Snapshot {0} is active and cannot be edited")]
    ActiveSnapshotImmutable(SnapshotId),

    #[error("Deployment {deployment_id} has snapshot {snapshot_id} in {status}")]
    SnapshotInFlight {
        deployment_id: DeploymentId,
        snapshot_id: SnapshotId,
        status: SnapshotStatus,
    },

    #[error("Definition loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CrowbarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrowbarError::InvalidName(_)
            | CrowbarError::DuplicateName { .. }
            | CrowbarError::InvalidDefinition(_)
            | CrowbarError::RoleAlreadyInList(_) => ErrorKind::Validation,

            CrowbarError::BarclampNotFound(_)
            | CrowbarError::TemplateNotFound(_)
            | CrowbarError::DeploymentNotFound(_)
            | CrowbarError::SnapshotNotFound(_)
            | CrowbarError::UnknownRole(_)
            | CrowbarError::RoleNotInList(_) => ErrorKind::NotFound,

            CrowbarError::SingleDeployment(_)
            | CrowbarError::IllegalTransition(_)
            | CrowbarError::ForeignSnapshot(_)
            | CrowbarError::ActiveSnapshotImmutable(_)
            | CrowbarError::SnapshotInFlight { .. } => ErrorKind::Conflict,

            CrowbarError::Loader(_) => ErrorKind::Loader,
            CrowbarError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<RegistryError> for CrowbarError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::BarclampNotFound(id) => CrowbarError::BarclampNotFound(id.to_string()),
            RegistryError::TemplateNotFound(id) => CrowbarError::TemplateNotFound(id),
            RegistryError::DeploymentNotFound(id) => CrowbarError::DeploymentNotFound(id),
            RegistryError::SnapshotNotFound(id) => CrowbarError::SnapshotNotFound(id),
            RegistryError::DuplicateDeploymentName { barclamp_id, name } => {
                CrowbarError::DuplicateName { barclamp_id, name }
            }
            RegistryError::ExclusiveDeployment { barclamp_id } => {
                CrowbarError::SingleDeployment(barclamp_id)
            }
            RegistryError::ForeignSnapshot(e) => CrowbarError::ForeignSnapshot(e),
            RegistryError::BarclampAlreadyExists(name) => {
                CrowbarError::Internal(format!("barclamp {name} registered concurrently"))
            }
            RegistryError::InvalidUpdate(msg) | RegistryError::Storage(msg) => {
                CrowbarError::Internal(msg)
            }
        }
    }
}

impl From<CatalogError> for CrowbarError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownRoleType(name) => CrowbarError::UnknownRole(name),
            CatalogError::RoleNotInList(id) => CrowbarError::RoleNotInList(id),
            CatalogError::RoleAlreadyInList(name) => CrowbarError::RoleAlreadyInList(name),
            CatalogError::DuplicateRoleType(_) => CrowbarError::InvalidDefinition(err.to_string()),
        }
    }
}

/// Result type for manager operations
pub type Result<T> = std::result::Result<T, CrowbarError>;
