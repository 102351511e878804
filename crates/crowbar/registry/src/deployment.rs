//! Deployment registry trait
//!
//! The DeploymentRegistry stores deployments and the snapshots they own. It
//! is the storage layer for the deployment model, so it enforces the
//! constraints that must hold under concurrent writers:
//!
//! - deployment names are unique per barclamp
//! - an exclusive insert fails if the barclamp already has a deployment
//! - a deployment and its initial snapshot are written together or not at all
//! - a new proposal is stored and pointed at together or not at all
//! - a deployment only ever points at snapshots it owns
//! - deleting a deployment deletes its snapshots

use crate::error::Result;
use async_trait::async_trait;
use crowbar_types::{BarclampId, Deployment, DeploymentId, Snapshot, SnapshotId};

/// Registry for deployments and snapshots
#[async_trait]
pub trait DeploymentRegistry: Send + Sync {
    /// Insert a deployment without snapshots.
    ///
    /// With `exclusive` set the insert fails if the barclamp already has any
    /// deployment.
    async fn insert(&self, deployment: Deployment, exclusive: bool) -> Result<()>;

    /// Insert a deployment and its first snapshot atomically
    async fn insert_with_snapshot(
        &self,
        deployment: Deployment,
        snapshot: Snapshot,
        exclusive: bool,
    ) -> Result<()>;

    /// Get a deployment by ID
    async fn get(&self, id: &DeploymentId) -> Result<Option<Deployment>>;

    /// Get a deployment by barclamp and name
    async fn get_by_name(&self, barclamp_id: &BarclampId, name: &str)
        -> Result<Option<Deployment>>;

    /// List a barclamp's deployments in creation order
    async fn list_for_barclamp(&self, barclamp_id: &BarclampId) -> Result<Vec<Deployment>>;

    /// Replace a stored deployment. Name and barclamp cannot change.
    async fn update(&self, deployment: Deployment) -> Result<()>;

    /// Delete a deployment and its snapshots, returning the removed snapshot IDs
    async fn delete(&self, id: &DeploymentId) -> Result<Vec<SnapshotId>>;

    /// Insert a snapshot for an existing deployment
    async fn insert_snapshot(&self, snapshot: Snapshot) -> Result<()>;

    /// Insert a snapshot and make it its deployment's proposal atomically.
    ///
    /// Returns the updated deployment. On error nothing is stored.
    async fn insert_proposed_snapshot(&self, snapshot: Snapshot) -> Result<Deployment>;

    /// Get a snapshot by ID
    async fn get_snapshot(&self, id: &SnapshotId) -> Result<Option<Snapshot>>;

    /// List a deployment's snapshots in creation order
    async fn list_snapshots(&self, deployment_id: &DeploymentId) -> Result<Vec<Snapshot>>;

    /// Replace a stored snapshot. The owning deployment cannot change.
    async fn update_snapshot(&self, snapshot: Snapshot) -> Result<()>;

    /// Count a barclamp's deployments
    async fn count_for_barclamp(&self, barclamp_id: &BarclampId) -> Result<usize> {
        Ok(self.list_for_barclamp(barclamp_id).await?.len())
    }

    /// Check if a deployment exists
    async fn exists(&self, id: &DeploymentId) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }
}
