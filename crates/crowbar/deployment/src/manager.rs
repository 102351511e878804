//! Barclamp Manager - High-level deployment model operations
//!
//! The BarclampManager is the main entry point for the deployment model. It
//! imports barclamps, creates proposals from templates, moves snapshots
//! through their lifecycle and answers status queries.
//!
//! Every mutating command runs under the owning barclamp's lock, so commands
//! touching one barclamp never interleave. Storage constraints (unique names,
//! single-deployment exclusivity) are enforced again by the registries.

use crate::config::ManagerConfig;
use crate::error::{CrowbarError, Result};
use crate::loader::{DefinitionLoader, FileDefinitionLoader};
use crate::locale::{Localizer, StaticLocalizer, DEFAULT_DEPLOYMENT_KEY};
use crate::lock::BarclampLocks;
use crowbar_registry::{
    BarclampRegistry, DeploymentRegistry, InMemoryBarclampRegistry, InMemoryDeploymentRegistry,
    RegistryError,
};
use crowbar_types::*;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

/// Barclamp Manager owns the deployment model
pub struct BarclampManager {
    /// Barclamps and templates
    barclamps: Arc<dyn BarclampRegistry>,
    /// Deployments and snapshots
    deployments: Arc<dyn DeploymentRegistry>,
    /// Source of barclamp definitions
    loader: Arc<dyn DefinitionLoader>,
    /// Default names
    localizer: Arc<dyn Localizer>,
    /// Per-barclamp command locks
    locks: BarclampLocks,
    /// Event channel
    event_tx: broadcast::Sender<CrowbarEventEnvelope>,
}

impl BarclampManager {
    /// Create a new barclamp manager
    pub fn new(
        config: &ManagerConfig,
        barclamps: Arc<dyn BarclampRegistry>,
        deployments: Arc<dyn DeploymentRegistry>,
        loader: Arc<dyn DefinitionLoader>,
        localizer: Arc<dyn Localizer>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            barclamps,
            deployments,
            loader,
            localizer,
            locks: BarclampLocks::new(),
            event_tx,
        }
    }

    /// In-memory registries with definitions read from `definitions_root`
    pub fn from_config(config: &ManagerConfig) -> Self {
        let loader = Arc::new(FileDefinitionLoader::new(config.definitions_root.clone()));
        Self::in_memory(config, loader)
    }

    /// In-memory registries with the given definition loader
    pub fn in_memory(config: &ManagerConfig, loader: Arc<dyn DefinitionLoader>) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryBarclampRegistry::new()),
            Arc::new(InMemoryDeploymentRegistry::new()),
            loader,
            Arc::new(StaticLocalizer::from_config(&config.locale)),
        )
    }

    /// Subscribe to deployment model events
    pub fn subscribe(&self) -> broadcast::Receiver<CrowbarEventEnvelope> {
        self.event_tx.subscribe()
    }

    // ---- Barclamps and templates ----

    /// Import a barclamp by name.
    ///
    /// Importing a name that already exists returns the existing record
    /// unchanged, including when two imports race.
    #[instrument(skip(self))]
    pub async fn import(
        &self,
        name: &str,
        parent: Option<&str>,
        source: Option<&Path>,
    ) -> Result<Barclamp> {
        // 1. Already imported
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(CrowbarError::InvalidDefinition(format!(
                "barclamp name {name:?} must be non-empty without whitespace"
            )));
        }
        if let Some(existing) = self.barclamps.get_by_name(name).await? {
            debug!(barclamp_id = %existing.id, "Barclamp already imported");
            return Ok(existing);
        }

        // 2. Resolve parent
        let parent_id = match parent {
            Some(parent) => Some(self.barclamp_by_name(parent).await?.id),
            None => None,
        };

        // 3. Load definition and build the catalog
        let loaded = self.loader.load(name, source).await?;
        let catalog = loaded.definition.catalog()?;

        // 4. Create barclamp and template records
        let mut barclamp = Barclamp::new(&loaded.definition, TemplateId::generate());
        if let Some(parent_id) = parent_id {
            barclamp = barclamp.with_parent(parent_id);
        }
        if let Some(path) = loaded.source_path {
            barclamp = barclamp.with_source_path(path);
        }
        let template = Template::for_barclamp(&barclamp, catalog);

        // 5. Register, resolving a lost race to the winner
        match self.barclamps.register(barclamp.clone(), template).await {
            Ok(()) => {}
            Err(RegistryError::BarclampAlreadyExists(_)) => {
                debug!("Barclamp imported concurrently");
                return self.barclamp_by_name(name).await;
            }
            Err(e) => return Err(e.into()),
        }

        self.emit_event(CrowbarEvent::BarclampImported {
            barclamp_id: barclamp.id.clone(),
            name: barclamp.name.clone(),
        });

        info!(barclamp_id = %barclamp.id, "Barclamp imported");

        Ok(barclamp)
    }

    /// Change whether a barclamp accepts more than one deployment.
    ///
    /// Existing deployments are left alone.
    #[instrument(skip(self), fields(barclamp_id = %barclamp_id))]
    pub async fn set_allow_multiple_deployments(
        &self,
        barclamp_id: &BarclampId,
        allow: bool,
    ) -> Result<Barclamp> {
        let _guard = self.locks.acquire(barclamp_id).await;
        let barclamp = self.barclamps.set_allow_multiple(barclamp_id, allow).await?;
        info!(allow, "Deployment policy changed");
        Ok(barclamp)
    }

    /// Append a catalog role to a barclamp's template
    #[instrument(skip(self), fields(barclamp_id = %barclamp_id))]
    pub async fn add_template_role(
        &self,
        barclamp_id: &BarclampId,
        role: &str,
    ) -> Result<RoleEntry> {
        let _guard = self.locks.acquire(barclamp_id).await;
        let mut template = self.template(barclamp_id).await?;
        let entry = template.add_role(role)?;
        self.barclamps.update_template(template).await?;
        debug!(role, order = entry.order, "Template role added");
        Ok(entry)
    }

    /// Move a role within a barclamp's template
    #[instrument(skip(self), fields(barclamp_id = %barclamp_id))]
    pub async fn set_template_role_order(
        &self,
        barclamp_id: &BarclampId,
        role_type_id: &RoleTypeId,
        order: i32,
        run_order: i32,
    ) -> Result<RoleEntry> {
        let _guard = self.locks.acquire(barclamp_id).await;
        let mut template = self.template(barclamp_id).await?;
        let entry = template.set_role_order(role_type_id, order, run_order)?;
        self.barclamps.update_template(template).await?;
        Ok(entry)
    }

    // ---- Deployments ----

    /// Create a bare deployment with no snapshots
    #[instrument(skip(self), fields(barclamp_id = %barclamp_id))]
    pub async fn create_deployment(
        &self,
        barclamp_id: &BarclampId,
        name: &str,
    ) -> Result<Deployment> {
        let name = DeploymentName::parse(name)?;
        let _guard = self.locks.acquire(barclamp_id).await;
        let barclamp = self.barclamp(barclamp_id).await?;

        let deployment = Deployment::new(
            name,
            barclamp.id.clone(),
            barclamp.allow_multiple_deployments,
        );
        self.deployments
            .insert(deployment.clone(), !barclamp.allow_multiple_deployments)
            .await?;

        self.emit_event(CrowbarEvent::DeploymentCreated {
            barclamp_id: barclamp.id,
            deployment_id: deployment.id.clone(),
            name: deployment.name.to_string(),
        });

        info!(deployment_id = %deployment.id, "Deployment created");

        Ok(deployment)
    }

    /// Create a deployment plus a proposed snapshot cloned from the template.
    ///
    /// Returns `Ok(None)` when the barclamp allows a single deployment and
    /// already has one. `name` defaults to the localized default name.
    #[instrument(skip(self), fields(barclamp_id = %barclamp_id))]
    pub async fn create_proposal(
        &self,
        barclamp_id: &BarclampId,
        name: Option<&str>,
    ) -> Result<Option<Deployment>> {
        let _guard = self.locks.acquire(barclamp_id).await;

        // 1. Policy check
        let barclamp = self.barclamp(barclamp_id).await?;
        let exclusive = !barclamp.allow_multiple_deployments;
        let name = match name {
            Some(name) => name.to_string(),
            None => self.localizer.translate(DEFAULT_DEPLOYMENT_KEY),
        };
        if exclusive && self.deployments.count_for_barclamp(&barclamp.id).await? > 0 {
            self.reject_proposal(&barclamp, name);
            return Ok(None);
        }

        // 2. Validate name
        let name = DeploymentName::parse(name)?;

        // 3. Build deployment and proposed snapshot
        let template = self.template_of(&barclamp).await?;
        let mut deployment = Deployment::new(name, barclamp.id.clone(), !exclusive);
        let mut snapshot = Snapshot::new(
            deployment.name.as_str(),
            deployment.id.clone(),
            barclamp.id.clone(),
            SnapshotStatus::None,
            RoleList::new(),
        );
        template.clone_into(&mut snapshot);
        deployment.set_proposed_snapshot(&snapshot)?;

        // 4. Persist both together
        match self
            .deployments
            .insert_with_snapshot(deployment.clone(), snapshot.clone(), exclusive)
            .await
        {
            Ok(()) => {}
            Err(RegistryError::ExclusiveDeployment { .. }) => {
                self.reject_proposal(&barclamp, deployment.name.to_string());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        // 5. Emit events
        self.emit_event(CrowbarEvent::DeploymentCreated {
            barclamp_id: barclamp.id.clone(),
            deployment_id: deployment.id.clone(),
            name: deployment.name.to_string(),
        });
        self.emit_event(CrowbarEvent::SnapshotCreated {
            deployment_id: deployment.id.clone(),
            snapshot_id: snapshot.id.clone(),
        });

        info!(
            deployment_id = %deployment.id,
            snapshot_id = %snapshot.id,
            roles = snapshot.roles.len(),
            "Proposal created"
        );

        Ok(Some(deployment))
    }

    /// Delete a deployment and all of its snapshots.
    ///
    /// Refused while the active snapshot is queued or committing.
    #[instrument(skip(self), fields(deployment_id = %deployment_id))]
    pub async fn delete_deployment(&self, deployment_id: &DeploymentId) -> Result<usize> {
        let deployment = self.deployment(deployment_id).await?;
        let _guard = self.locks.acquire(&deployment.barclamp_id).await;
        let deployment = self.deployment(deployment_id).await?;

        if let Some(active) = self.active_snapshot_of(&deployment).await? {
            if active.status.is_in_flight() {
                return Err(CrowbarError::SnapshotInFlight {
                    deployment_id: deployment.id,
                    snapshot_id: active.id,
                    status: active.status,
                });
            }
        }

        let removed = self.deployments.delete(deployment_id).await?;

        self.emit_event(CrowbarEvent::DeploymentDeleted {
            deployment_id: deployment_id.clone(),
            snapshots_removed: removed.len(),
        });

        info!(snapshots_removed = removed.len(), "Deployment deleted");

        Ok(removed.len())
    }

    // ---- Snapshots ----

    /// Create a snapshot for a deployment.
    ///
    /// Without `roles` the barclamp's template is cloned.
    #[instrument(skip(self, roles), fields(deployment_id = %deployment_id))]
    pub async fn create_snapshot(
        &self,
        deployment_id: &DeploymentId,
        name: &str,
        status: SnapshotStatus,
        roles: Option<RoleList>,
    ) -> Result<Snapshot> {
        // Snapshot names follow the deployment name rules
        let name = DeploymentName::parse(name)?;
        let deployment = self.deployment(deployment_id).await?;
        let _guard = self.locks.acquire(&deployment.barclamp_id).await;

        let roles = match roles {
            Some(roles) => roles,
            None => {
                let barclamp = self.barclamp(&deployment.barclamp_id).await?;
                self.template_of(&barclamp).await?.roles.deep_clone()
            }
        };
        let snapshot = Snapshot::new(
            name.as_str(),
            deployment.id.clone(),
            deployment.barclamp_id.clone(),
            status,
            roles,
        );

        self.deployments.insert_snapshot(snapshot.clone()).await?;

        self.emit_event(CrowbarEvent::SnapshotCreated {
            deployment_id: deployment.id,
            snapshot_id: snapshot.id.clone(),
        });

        debug!(snapshot_id = %snapshot.id, %status, "Snapshot created");

        Ok(snapshot)
    }

    /// Start a new proposal for a deployment.
    ///
    /// The roles are deep-copied from the active snapshot, falling back to
    /// the current proposal and then to the template.
    #[instrument(skip(self), fields(deployment_id = %deployment_id))]
    pub async fn derive_proposal(
        &self,
        deployment_id: &DeploymentId,
        name: &str,
    ) -> Result<Snapshot> {
        let name = DeploymentName::parse(name)?;
        let deployment = self.deployment(deployment_id).await?;
        let _guard = self.locks.acquire(&deployment.barclamp_id).await;
        let deployment = self.deployment(deployment_id).await?;

        let source = match deployment
            .active_snapshot_id
            .as_ref()
            .or(deployment.proposed_snapshot_id.as_ref())
        {
            Some(id) => Some(self.snapshot(id).await?),
            None => None,
        };

        let mut snapshot = Snapshot::new(
            name.as_str(),
            deployment.id.clone(),
            deployment.barclamp_id.clone(),
            SnapshotStatus::None,
            RoleList::new(),
        );
        match source {
            Some(source) => snapshot.roles = source.roles.deep_clone(),
            None => {
                let barclamp = self.barclamp(&deployment.barclamp_id).await?;
                self.template_of(&barclamp).await?.clone_into(&mut snapshot);
            }
        }

        // Store and repoint in one registry write
        self.deployments
            .insert_proposed_snapshot(snapshot.clone())
            .await?;

        self.emit_event(CrowbarEvent::SnapshotCreated {
            deployment_id: deployment_id.clone(),
            snapshot_id: snapshot.id.clone(),
        });

        info!(snapshot_id = %snapshot.id, "Proposal derived");

        Ok(snapshot)
    }

    /// Add a catalog role to a snapshot.
    ///
    /// Active snapshots are immutable.
    #[instrument(skip(self), fields(snapshot_id = %snapshot_id))]
    pub async fn add_snapshot_role(
        &self,
        snapshot_id: &SnapshotId,
        role: &str,
    ) -> Result<RoleEntry> {
        let snapshot = self.snapshot(snapshot_id).await?;
        let _guard = self.locks.acquire(&snapshot.barclamp_id).await;
        let mut snapshot = self.snapshot(snapshot_id).await?;

        let deployment = self.deployment(&snapshot.deployment_id).await?;
        if deployment.is_active_snapshot(&snapshot.id) {
            return Err(CrowbarError::ActiveSnapshotImmutable(snapshot.id));
        }

        let barclamp = self.barclamp(&snapshot.barclamp_id).await?;
        let template = self.template_of(&barclamp).await?;
        let entry = snapshot.roles.add(template.catalog.lookup(role)?)?;
        snapshot.updated_at = chrono::Utc::now();
        self.deployments.update_snapshot(snapshot).await?;

        debug!(role, "Snapshot role added");

        Ok(entry)
    }

    /// Make `snapshot_id` the deployment's active snapshot
    #[instrument(skip(self), fields(deployment_id = %deployment_id, snapshot_id = %snapshot_id))]
    pub async fn set_active_snapshot(
        &self,
        deployment_id: &DeploymentId,
        snapshot_id: &SnapshotId,
    ) -> Result<Deployment> {
        let deployment = self.deployment(deployment_id).await?;
        let _guard = self.locks.acquire(&deployment.barclamp_id).await;
        let mut deployment = self.deployment(deployment_id).await?;

        let snapshot = self.snapshot(snapshot_id).await?;
        deployment.set_active_snapshot(&snapshot)?;
        self.deployments.update(deployment.clone()).await?;

        self.emit_event(CrowbarEvent::SnapshotActivated {
            deployment_id: deployment.id.clone(),
            snapshot_id: snapshot.id,
        });

        info!(status = %snapshot.status, "Snapshot activated");

        Ok(deployment)
    }

    /// Deactivate a deployment
    #[instrument(skip(self), fields(deployment_id = %deployment_id))]
    pub async fn clear_active_snapshot(&self, deployment_id: &DeploymentId) -> Result<Deployment> {
        let deployment = self.deployment(deployment_id).await?;
        let _guard = self.locks.acquire(&deployment.barclamp_id).await;
        let mut deployment = self.deployment(deployment_id).await?;

        if !deployment.is_active() {
            return Ok(deployment);
        }

        deployment.clear_active_snapshot();
        self.deployments.update(deployment.clone()).await?;

        self.emit_event(CrowbarEvent::SnapshotDeactivated {
            deployment_id: deployment.id.clone(),
        });

        info!("Deployment deactivated");

        Ok(deployment)
    }

    /// Move a snapshot along the transition table
    #[instrument(skip(self), fields(snapshot_id = %snapshot_id, to = %next))]
    pub async fn transition(
        &self,
        snapshot_id: &SnapshotId,
        next: SnapshotStatus,
    ) -> Result<Snapshot> {
        self.apply_transition(snapshot_id, next, TransitionMode::Checked, None)
            .await
    }

    /// Set a snapshot's status regardless of the transition table
    #[instrument(skip(self), fields(snapshot_id = %snapshot_id, to = %next))]
    pub async fn force_transition(
        &self,
        snapshot_id: &SnapshotId,
        next: SnapshotStatus,
        reason: &str,
    ) -> Result<Snapshot> {
        self.apply_transition(snapshot_id, next, TransitionMode::Forced, Some(reason))
            .await
    }

    async fn apply_transition(
        &self,
        snapshot_id: &SnapshotId,
        next: SnapshotStatus,
        mode: TransitionMode,
        reason: Option<&str>,
    ) -> Result<Snapshot> {
        let snapshot = self.snapshot(snapshot_id).await?;
        let _guard = self.locks.acquire(&snapshot.barclamp_id).await;
        let mut snapshot = self.snapshot(snapshot_id).await?;

        let previous = snapshot.transition(next, mode)?;
        if previous == next {
            return Ok(snapshot);
        }

        self.deployments.update_snapshot(snapshot.clone()).await?;

        let forced = mode == TransitionMode::Forced;
        self.emit_event(CrowbarEvent::SnapshotTransitioned {
            snapshot_id: snapshot.id.clone(),
            from: previous,
            to: next,
            forced,
        });

        if forced {
            warn!(from = %previous, reason = reason.unwrap_or_default(), "Snapshot status forced");
        } else {
            info!(from = %previous, "Snapshot transitioned");
        }

        Ok(snapshot)
    }

    // ---- Queries ----

    pub async fn barclamp(&self, id: &BarclampId) -> Result<Barclamp> {
        self.barclamps
            .get(id)
            .await?
            .ok_or_else(|| CrowbarError::BarclampNotFound(id.to_string()))
    }

    pub async fn barclamp_by_name(&self, name: &str) -> Result<Barclamp> {
        self.barclamps
            .get_by_name(name)
            .await?
            .ok_or_else(|| CrowbarError::BarclampNotFound(name.to_string()))
    }

    pub async fn barclamps(&self) -> Result<Vec<Barclamp>> {
        Ok(self.barclamps.list().await?)
    }

    /// The barclamp's current template
    pub async fn template(&self, barclamp_id: &BarclampId) -> Result<Template> {
        let barclamp = self.barclamp(barclamp_id).await?;
        self.template_of(&barclamp).await
    }

    pub async fn deployment(&self, id: &DeploymentId) -> Result<Deployment> {
        self.deployments
            .get(id)
            .await?
            .ok_or_else(|| CrowbarError::DeploymentNotFound(id.clone()))
    }

    /// A barclamp's deployments in creation order
    pub async fn deployments(&self, barclamp_id: &BarclampId) -> Result<Vec<Deployment>> {
        Ok(self.deployments.list_for_barclamp(barclamp_id).await?)
    }

    pub async fn snapshot(&self, id: &SnapshotId) -> Result<Snapshot> {
        self.deployments
            .get_snapshot(id)
            .await?
            .ok_or_else(|| CrowbarError::SnapshotNotFound(id.clone()))
    }

    /// A deployment's snapshots in creation order
    pub async fn snapshots(&self, deployment_id: &DeploymentId) -> Result<Vec<Snapshot>> {
        self.deployment(deployment_id).await?;
        Ok(self.deployments.list_snapshots(deployment_id).await?)
    }

    pub async fn active_snapshot(&self, deployment_id: &DeploymentId) -> Result<Option<Snapshot>> {
        let deployment = self.deployment(deployment_id).await?;
        self.active_snapshot_of(&deployment).await
    }

    pub async fn proposed_snapshot(
        &self,
        deployment_id: &DeploymentId,
    ) -> Result<Option<Snapshot>> {
        let deployment = self.deployment(deployment_id).await?;
        match &deployment.proposed_snapshot_id {
            Some(id) => Ok(self.deployments.get_snapshot(id).await?),
            None => Ok(None),
        }
    }

    pub async fn is_active(&self, deployment_id: &DeploymentId) -> Result<bool> {
        Ok(self.deployment(deployment_id).await?.is_active())
    }

    /// Lifecycle state derived from the active snapshot
    pub async fn status(&self, deployment_id: &DeploymentId) -> Result<LifecycleState> {
        let deployment = self.deployment(deployment_id).await?;
        let active = self.active_snapshot_of(&deployment).await?;
        Ok(deployment.status(active.as_ref()))
    }

    // ---- Helpers ----

    async fn template_of(&self, barclamp: &Barclamp) -> Result<Template> {
        self.barclamps
            .get_template(&barclamp.template_id)
            .await?
            .ok_or_else(|| CrowbarError::TemplateNotFound(barclamp.template_id.clone()))
    }

    async fn active_snapshot_of(&self, deployment: &Deployment) -> Result<Option<Snapshot>> {
        match &deployment.active_snapshot_id {
            Some(id) => Ok(self.deployments.get_snapshot(id).await?),
            None => Ok(None),
        }
    }

    fn reject_proposal(&self, barclamp: &Barclamp, name: String) {
        warn!(
            barclamp = %barclamp.name,
            name = %name,
            "Proposal rejected: barclamp allows a single deployment"
        );
        self.emit_event(CrowbarEvent::ProposalRejected {
            barclamp_id: barclamp.id.clone(),
            name,
        });
    }

    fn emit_event(&self, event: CrowbarEvent) {
        let envelope = CrowbarEventEnvelope::new(event);
        let _ = self.event_tx.send(envelope);
    }
}
