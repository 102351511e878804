//! Deployment types
//!
//! A deployment is a named instantiation of a barclamp's template. It owns a
//! history of snapshots and points at two of them: the proposed snapshot
//! (the one being edited) and the active snapshot (the authoritative one).

use crate::name::DeploymentName;
use crate::snapshot::{LifecycleState, Snapshot};
use crate::{BarclampId, DeploymentId, SnapshotId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A snapshot was assigned to a deployment that does not own it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{snapshot_id} belongs to {owner}, not {deployment_id}")]
pub struct OwnershipError {
    pub snapshot_id: SnapshotId,
    pub owner: DeploymentId,
    pub deployment_id: DeploymentId,
}

/// A named deployment of a barclamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,

    /// Unique within the owning barclamp
    pub name: DeploymentName,

    pub barclamp_id: BarclampId,

    /// Inherited from the barclamp when the deployment was created
    pub allow_multiple: bool,

    /// Authoritative snapshot, if the deployment has been activated
    pub active_snapshot_id: Option<SnapshotId>,

    /// Snapshot currently being proposed
    pub proposed_snapshot_id: Option<SnapshotId>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Deployment {
    pub fn new(name: DeploymentName, barclamp_id: BarclampId, allow_multiple: bool) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: DeploymentId::generate(),
            name,
            barclamp_id,
            allow_multiple,
            active_snapshot_id: None,
            proposed_snapshot_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_snapshot_id.is_some()
    }

    /// Whether `snapshot_id` is this deployment's active snapshot
    pub fn is_active_snapshot(&self, snapshot_id: &SnapshotId) -> bool {
        self.active_snapshot_id.as_ref() == Some(snapshot_id)
    }

    /// Derived status. `active` must be the snapshot `active_snapshot_id`
    /// points at; anything else is ignored and reported as inactive.
    pub fn status(&self, active: Option<&Snapshot>) -> LifecycleState {
        match (&self.active_snapshot_id, active) {
            (Some(id), Some(s)) if &s.id == id => LifecycleState::derive(Some(s)),
            _ => LifecycleState::Inactive,
        }
    }

    pub fn set_active_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), OwnershipError> {
        self.check_owned(snapshot)?;
        self.active_snapshot_id = Some(snapshot.id.clone());
        self.updated_at = chrono::Utc::now();
        Ok(())
    }

    pub fn clear_active_snapshot(&mut self) {
        self.active_snapshot_id = None;
        self.updated_at = chrono::Utc::now();
    }

    pub fn set_proposed_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), OwnershipError> {
        self.check_owned(snapshot)?;
        self.proposed_snapshot_id = Some(snapshot.id.clone());
        self.updated_at = chrono::Utc::now();
        Ok(())
    }

    fn check_owned(&self, snapshot: &Snapshot) -> Result<(), OwnershipError> {
        if snapshot.deployment_id != self.id {
            return Err(OwnershipError {
                snapshot_id: snapshot.id.clone(),
                owner: snapshot.deployment_id.clone(),
                deployment_id: self.id.clone(),
            });
        }
        Ok(())
    }
}
