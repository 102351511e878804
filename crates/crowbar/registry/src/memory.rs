//! In-memory implementations of registry traits
//!
//! These are suitable for development and testing. Persistent backends must
//! provide the same constraints.
//!
//! Lock order: a barclamp index entry (or a deployment's snapshot index entry)
//! is taken first and held across the check and the write it guards. Record
//! maps are only touched while holding an index entry, never the other way
//! around.

use crate::barclamp::BarclampRegistry;
use crate::deployment::DeploymentRegistry;
use crate::error::{RegistryError, Result};
use async_trait::async_trait;
use crowbar_types::{
    Barclamp, BarclampId, Deployment, DeploymentId, OwnershipError, Snapshot, SnapshotId,
    Template, TemplateId,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use tracing::debug;

/// In-memory barclamp registry
pub struct InMemoryBarclampRegistry {
    barclamps: DashMap<BarclampId, Barclamp>,
    by_name: DashMap<String, BarclampId>,
    templates: DashMap<TemplateId, Template>,
}

impl InMemoryBarclampRegistry {
    pub fn new() -> Self {
        Self {
            barclamps: DashMap::new(),
            by_name: DashMap::new(),
            templates: DashMap::new(),
        }
    }
}

impl Default for InMemoryBarclampRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BarclampRegistry for InMemoryBarclampRegistry {
    async fn register(&self, barclamp: Barclamp, template: Template) -> Result<()> {
        if template.barclamp_id != barclamp.id || template.id != barclamp.template_id {
            return Err(RegistryError::InvalidUpdate(format!(
                "template {} does not belong to {}",
                template.id, barclamp.id
            )));
        }

        match self.by_name.entry(barclamp.name.clone()) {
            Entry::Occupied(_) => Err(RegistryError::BarclampAlreadyExists(barclamp.name)),
            Entry::Vacant(slot) => {
                debug!(barclamp = %barclamp.name, id = %barclamp.id, "registering barclamp");
                self.templates.insert(template.id.clone(), template);
                slot.insert(barclamp.id.clone());
                self.barclamps.insert(barclamp.id.clone(), barclamp);
                Ok(())
            }
        }
    }

    async fn get(&self, id: &BarclampId) -> Result<Option<Barclamp>> {
        Ok(self.barclamps.get(id).map(|b| b.clone()))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Barclamp>> {
        let id = match self.by_name.get(name) {
            Some(id) => id.clone(),
            None => return Ok(None),
        };
        self.get(&id).await
    }

    async fn list(&self) -> Result<Vec<Barclamp>> {
        let mut all: Vec<Barclamp> = self.barclamps.iter().map(|b| b.value().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn set_allow_multiple(&self, id: &BarclampId, allow: bool) -> Result<Barclamp> {
        if let Some(mut barclamp) = self.barclamps.get_mut(id) {
            barclamp.allow_multiple_deployments = allow;
            barclamp.updated_at = chrono::Utc::now();
            Ok(barclamp.clone())
        } else {
            Err(RegistryError::BarclampNotFound(id.clone()))
        }
    }

    async fn get_template(&self, id: &TemplateId) -> Result<Option<Template>> {
        Ok(self.templates.get(id).map(|t| t.clone()))
    }

    async fn update_template(&self, template: Template) -> Result<()> {
        if let Some(mut existing) = self.templates.get_mut(&template.id) {
            if existing.barclamp_id != template.barclamp_id {
                return Err(RegistryError::InvalidUpdate(format!(
                    "template {} cannot move to another barclamp",
                    template.id
                )));
            }
            *existing = template;
            Ok(())
        } else {
            Err(RegistryError::TemplateNotFound(template.id))
        }
    }
}

/// Per-barclamp deployment index
#[derive(Debug, Default)]
struct BarclampIndex {
    /// Deployment IDs in creation order
    order: Vec<DeploymentId>,
    /// Name -> deployment, the unique `(barclamp_id, name)` constraint
    names: HashMap<String, DeploymentId>,
}

/// In-memory deployment registry
pub struct InMemoryDeploymentRegistry {
    deployments: DashMap<DeploymentId, Deployment>,
    by_barclamp: DashMap<BarclampId, BarclampIndex>,
    snapshots: DashMap<SnapshotId, Snapshot>,
    by_deployment: DashMap<DeploymentId, Vec<SnapshotId>>,
}

impl InMemoryDeploymentRegistry {
    pub fn new() -> Self {
        Self {
            deployments: DashMap::new(),
            by_barclamp: DashMap::new(),
            snapshots: DashMap::new(),
            by_deployment: DashMap::new(),
        }
    }

    /// Total number of snapshots stored
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    fn insert_inner(
        &self,
        deployment: Deployment,
        snapshot: Option<Snapshot>,
        exclusive: bool,
    ) -> Result<()> {
        if let Some(s) = &snapshot {
            if s.deployment_id != deployment.id {
                return Err(OwnershipError {
                    snapshot_id: s.id.clone(),
                    owner: s.deployment_id.clone(),
                    deployment_id: deployment.id.clone(),
                }
                .into());
            }
        }

        let mut index = self
            .by_barclamp
            .entry(deployment.barclamp_id.clone())
            .or_default();

        // A taken name is reported before the single-deployment policy.
        if index.names.contains_key(deployment.name.as_str()) {
            return Err(RegistryError::DuplicateDeploymentName {
                barclamp_id: deployment.barclamp_id.clone(),
                name: deployment.name.to_string(),
            });
        }

        if exclusive && !index.order.is_empty() {
            return Err(RegistryError::ExclusiveDeployment {
                barclamp_id: deployment.barclamp_id.clone(),
            });
        }

        debug!(deployment = %deployment.id, name = %deployment.name, "inserting deployment");

        let mut snapshot_ids = Vec::new();
        if let Some(s) = snapshot {
            snapshot_ids.push(s.id.clone());
            self.snapshots.insert(s.id.clone(), s);
        }
        self.by_deployment
            .insert(deployment.id.clone(), snapshot_ids);

        index
            .names
            .insert(deployment.name.to_string(), deployment.id.clone());
        index.order.push(deployment.id.clone());
        self.deployments.insert(deployment.id.clone(), deployment);
        Ok(())
    }

    fn check_snapshot_refs(&self, deployment: &Deployment) -> Result<()> {
        let refs = [
            deployment.active_snapshot_id.as_ref(),
            deployment.proposed_snapshot_id.as_ref(),
        ];
        for id in refs.into_iter().flatten() {
            let owner = self
                .snapshots
                .get(id)
                .map(|s| s.deployment_id.clone())
                .ok_or_else(|| RegistryError::SnapshotNotFound(id.clone()))?;
            if owner != deployment.id {
                return Err(OwnershipError {
                    snapshot_id: id.clone(),
                    owner,
                    deployment_id: deployment.id.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

impl Default for InMemoryDeploymentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeploymentRegistry for InMemoryDeploymentRegistry {
    async fn insert(&self, deployment: Deployment, exclusive: bool) -> Result<()> {
        self.insert_inner(deployment, None, exclusive)
    }

    async fn insert_with_snapshot(
        &self,
        deployment: Deployment,
        snapshot: Snapshot,
        exclusive: bool,
    ) -> Result<()> {
        self.insert_inner(deployment, Some(snapshot), exclusive)
    }

    async fn get(&self, id: &DeploymentId) -> Result<Option<Deployment>> {
        Ok(self.deployments.get(id).map(|d| d.clone()))
    }

    async fn get_by_name(
        &self,
        barclamp_id: &BarclampId,
        name: &str,
    ) -> Result<Option<Deployment>> {
        let id = match self
            .by_barclamp
            .get(barclamp_id)
            .and_then(|index| index.names.get(name).cloned())
        {
            Some(id) => id,
            None => return Ok(None),
        };
        self.get(&id).await
    }

    async fn list_for_barclamp(&self, barclamp_id: &BarclampId) -> Result<Vec<Deployment>> {
        let ids = match self.by_barclamp.get(barclamp_id) {
            Some(index) => index.order.clone(),
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .iter()
            .filter_map(|id| self.deployments.get(id).map(|d| d.clone()))
            .collect())
    }

    async fn update(&self, deployment: Deployment) -> Result<()> {
        self.check_snapshot_refs(&deployment)?;

        if let Some(mut existing) = self.deployments.get_mut(&deployment.id) {
            if existing.name != deployment.name || existing.barclamp_id != deployment.barclamp_id
            {
                return Err(RegistryError::InvalidUpdate(format!(
                    "{} cannot be renamed or moved",
                    deployment.id
                )));
            }
            *existing = deployment;
            Ok(())
        } else {
            Err(RegistryError::DeploymentNotFound(deployment.id))
        }
    }

    async fn delete(&self, id: &DeploymentId) -> Result<Vec<SnapshotId>> {
        let barclamp_id = self
            .deployments
            .get(id)
            .map(|d| d.barclamp_id.clone())
            .ok_or_else(|| RegistryError::DeploymentNotFound(id.clone()))?;

        {
            let mut index = self
                .by_barclamp
                .get_mut(&barclamp_id)
                .ok_or_else(|| RegistryError::DeploymentNotFound(id.clone()))?;

            let (_, removed) = self
                .deployments
                .remove(id)
                .ok_or_else(|| RegistryError::DeploymentNotFound(id.clone()))?;
            index.order.retain(|d| d != id);
            index.names.remove(removed.name.as_str());
        }

        let snapshot_ids = self
            .by_deployment
            .remove(id)
            .map(|(_, ids)| ids)
            .unwrap_or_default();
        for snapshot_id in &snapshot_ids {
            self.snapshots.remove(snapshot_id);
        }

        debug!(deployment = %id, snapshots = snapshot_ids.len(), "deleted deployment");
        Ok(snapshot_ids)
    }

    async fn insert_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        // The snapshot index entry exists exactly as long as the deployment.
        let mut ids = self
            .by_deployment
            .get_mut(&snapshot.deployment_id)
            .ok_or_else(|| RegistryError::DeploymentNotFound(snapshot.deployment_id.clone()))?;

        ids.push(snapshot.id.clone());
        self.snapshots.insert(snapshot.id.clone(), snapshot);
        Ok(())
    }

    async fn insert_proposed_snapshot(&self, snapshot: Snapshot) -> Result<Deployment> {
        // Holding the snapshot index entry keeps a concurrent delete from
        // cascading until both writes are done.
        let mut ids = self
            .by_deployment
            .get_mut(&snapshot.deployment_id)
            .ok_or_else(|| RegistryError::DeploymentNotFound(snapshot.deployment_id.clone()))?;
        let mut deployment = self
            .deployments
            .get_mut(&snapshot.deployment_id)
            .ok_or_else(|| RegistryError::DeploymentNotFound(snapshot.deployment_id.clone()))?;

        let mut updated = deployment.clone();
        updated.set_proposed_snapshot(&snapshot)?;

        debug!(deployment = %updated.id, snapshot = %snapshot.id, "inserting proposal");

        ids.push(snapshot.id.clone());
        self.snapshots.insert(snapshot.id.clone(), snapshot);
        *deployment = updated.clone();
        Ok(updated)
    }

    async fn get_snapshot(&self, id: &SnapshotId) -> Result<Option<Snapshot>> {
        Ok(self.snapshots.get(id).map(|s| s.clone()))
    }

    async fn list_snapshots(&self, deployment_id: &DeploymentId) -> Result<Vec<Snapshot>> {
        let ids = self
            .by_deployment
            .get(deployment_id)
            .map(|ids| ids.clone())
            .ok_or_else(|| RegistryError::DeploymentNotFound(deployment_id.clone()))?;
        Ok(ids
            .iter()
            .filter_map(|id| self.snapshots.get(id).map(|s| s.clone()))
            .collect())
    }

    async fn update_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        if let Some(mut existing) = self.snapshots.get_mut(&snapshot.id) {
            if existing.deployment_id != snapshot.deployment_id {
                return Err(RegistryError::InvalidUpdate(format!(
                    "{} cannot move to another deployment",
                    snapshot.id
                )));
            }
            *existing = snapshot;
            Ok(())
        } else {
            Err(RegistryError::SnapshotNotFound(snapshot.id))
        }
    }
}
