//! Event types for deployment lifecycle observability
//!
//! Events provide a unified stream of barclamp, deployment and snapshot
//! activity for external consumers.

use crate::{BarclampId, DeploymentId, SnapshotId, SnapshotStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all Crowbar events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrowbarEventEnvelope {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Event source
    pub source: EventSource,

    /// Event severity
    pub severity: EventSeverity,

    /// The actual event
    pub event: CrowbarEvent,
}

impl CrowbarEventEnvelope {
    pub fn new(event: CrowbarEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            source: event.source(),
            severity: event.severity(),
            event,
        }
    }
}

/// Event sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    /// Barclamp import and template edits
    Registry,
    /// Deployment lifecycle
    Deployment,
    /// Snapshot lifecycle
    Snapshot,
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Info,
    Warning,
}

/// Crowbar events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CrowbarEvent {
    BarclampImported {
        barclamp_id: BarclampId,
        name: String,
    },

    DeploymentCreated {
        barclamp_id: BarclampId,
        deployment_id: DeploymentId,
        name: String,
    },

    /// A proposal was refused because the barclamp allows one deployment
    ProposalRejected {
        barclamp_id: BarclampId,
        name: String,
    },

    DeploymentDeleted {
        deployment_id: DeploymentId,
        snapshots_removed: usize,
    },

    SnapshotCreated {
        deployment_id: DeploymentId,
        snapshot_id: SnapshotId,
    },

    SnapshotTransitioned {
        snapshot_id: SnapshotId,
        from: SnapshotStatus,
        to: SnapshotStatus,
        /// Operator override of the transition table
        forced: bool,
    },

    SnapshotActivated {
        deployment_id: DeploymentId,
        snapshot_id: SnapshotId,
    },

    SnapshotDeactivated {
        deployment_id: DeploymentId,
    },
}

impl CrowbarEvent {
    pub fn source(&self) -> EventSource {
        match self {
            CrowbarEvent::BarclampImported { .. } => EventSource::Registry,
            CrowbarEvent::DeploymentCreated { .. }
            | CrowbarEvent::ProposalRejected { .. }
            | CrowbarEvent::DeploymentDeleted { .. } => EventSource::Deployment,
            CrowbarEvent::SnapshotCreated { .. }
            | CrowbarEvent::SnapshotTransitioned { .. }
            | CrowbarEvent::SnapshotActivated { .. }
            | CrowbarEvent::SnapshotDeactivated { .. } => EventSource::Snapshot,
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CrowbarEvent::ProposalRejected { .. } => EventSeverity::Warning,
            CrowbarEvent::SnapshotTransitioned { forced: true, .. } => EventSeverity::Warning,
            _ => EventSeverity::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forced_transition_is_warning() {
        let envelope = CrowbarEventEnvelope::new(CrowbarEvent::SnapshotTransitioned {
            snapshot_id: SnapshotId::generate(),
            from: SnapshotStatus::Applied,
            to: SnapshotStatus::Hold,
            forced: true,
        });
        assert_eq!(envelope.source, EventSource::Snapshot);
        assert_eq!(envelope.severity, EventSeverity::Warning);
    }

    #[test]
    fn test_envelope_serializes() {
        let envelope = CrowbarEventEnvelope::new(CrowbarEvent::DeploymentDeleted {
            deployment_id: DeploymentId::generate(),
            snapshots_removed: 2,
        });
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["source"], "Deployment");
    }
}
