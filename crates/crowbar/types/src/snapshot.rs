//! Snapshot types and the snapshot status state machine
//!
//! A snapshot is a point-in-time configuration of a deployment. Its status
//! moves through a fixed transition table:
//!
//! ```text
//! NONE -> QUEUED -> COMMITTING -> APPLIED | FAILED
//! APPLIED | FAILED -> QUEUED           (retry / redeploy)
//! NONE | QUEUED | COMMITTING -> HOLD   (operator hold)
//! HOLD -> NONE | QUEUED                (release)
//! ```
//!
//! Anything else needs [`TransitionMode::Forced`].

use crate::role::RoleList;
use crate::{BarclampId, DeploymentId, SnapshotId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Internal snapshot status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotStatus {
    /// Proposed, not applied
    #[default]
    None,
    /// Waiting for resources to commit
    Queued,
    /// Commit in progress
    Committing,
    /// Last commit attempt failed
    Failed,
    /// Last commit attempt succeeded
    Applied,
    /// Held by an operator
    Hold,
}

impl SnapshotStatus {
    pub const STATUS_NONE: i32 = 1;
    pub const STATUS_QUEUED: i32 = 2;
    pub const STATUS_COMMITTING: i32 = 3;
    pub const STATUS_FAILED: i32 = 4;
    pub const STATUS_APPLIED: i32 = 5;
    pub const STATUS_HOLD: i32 = -1;

    /// Stored integer code
    pub fn code(self) -> i32 {
        match self {
            SnapshotStatus::None => Self::STATUS_NONE,
            SnapshotStatus::Queued => Self::STATUS_QUEUED,
            SnapshotStatus::Committing => Self::STATUS_COMMITTING,
            SnapshotStatus::Failed => Self::STATUS_FAILED,
            SnapshotStatus::Applied => Self::STATUS_APPLIED,
            SnapshotStatus::Hold => Self::STATUS_HOLD,
        }
    }

    /// Decode a stored code. Unrecognised codes are treated as a hold marker.
    pub fn from_code(code: i32) -> Self {
        match code {
            Self::STATUS_NONE => SnapshotStatus::None,
            Self::STATUS_QUEUED => SnapshotStatus::Queued,
            Self::STATUS_COMMITTING => SnapshotStatus::Committing,
            Self::STATUS_FAILED => SnapshotStatus::Failed,
            Self::STATUS_APPLIED => SnapshotStatus::Applied,
            _ => SnapshotStatus::Hold,
        }
    }

    /// Externally visible state for this status
    pub fn lifecycle_state(self) -> LifecycleState {
        match self {
            SnapshotStatus::None => LifecycleState::None,
            SnapshotStatus::Queued => LifecycleState::Pending,
            SnapshotStatus::Committing => LifecycleState::Unready,
            SnapshotStatus::Failed => LifecycleState::Failed,
            SnapshotStatus::Applied => LifecycleState::Ready,
            SnapshotStatus::Hold => LifecycleState::Hold,
        }
    }

    /// Whether a commit is underway
    pub fn is_in_flight(self) -> bool {
        matches!(self, SnapshotStatus::Queued | SnapshotStatus::Committing)
    }

    /// Whether the checked state machine allows `self -> next`
    pub fn can_transition_to(self, next: SnapshotStatus) -> bool {
        use SnapshotStatus::*;

        matches!(
            (self, next),
            (None, Queued)
                | (Queued, Committing)
                | (Committing, Applied)
                | (Committing, Failed)
                | (Failed, Queued)
                | (Applied, Queued)
                | (None, Hold)
                | (Queued, Hold)
                | (Committing, Hold)
                | (Hold, None)
                | (Hold, Queued)
        )
    }
}

impl fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotStatus::None => write!(f, "NONE"),
            SnapshotStatus::Queued => write!(f, "QUEUED"),
            SnapshotStatus::Committing => write!(f, "COMMITTING"),
            SnapshotStatus::Failed => write!(f, "FAILED"),
            SnapshotStatus::Applied => write!(f, "APPLIED"),
            SnapshotStatus::Hold => write!(f, "HOLD"),
        }
    }
}

/// Externally visible lifecycle state of a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    None,
    Pending,
    Unready,
    Failed,
    Ready,
    Hold,
    /// The deployment has no active snapshot
    Inactive,
}

impl LifecycleState {
    /// Derive a deployment's state from its active snapshot
    pub fn derive(active: Option<&Snapshot>) -> Self {
        active.map_or(LifecycleState::Inactive, |s| s.status.lifecycle_state())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::None => "none",
            LifecycleState::Pending => "pending",
            LifecycleState::Unready => "unready",
            LifecycleState::Failed => "failed",
            LifecycleState::Ready => "ready",
            LifecycleState::Hold => "hold",
            LifecycleState::Inactive => "inactive",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strictly a transition is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionMode {
    /// Only moves in the transition table are accepted
    Checked,
    /// Operator override, any move is accepted
    Forced,
}

/// Rejected status transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal snapshot transition {from} -> {to}")]
pub struct TransitionError {
    pub from: SnapshotStatus,
    pub to: SnapshotStatus,
}

/// A point-in-time configuration of a deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub name: String,

    /// Owning deployment
    pub deployment_id: DeploymentId,

    /// Barclamp the owning deployment belongs to
    pub barclamp_id: BarclampId,

    pub status: SnapshotStatus,

    /// Ordered roles, deep-copied from a template or an earlier snapshot
    pub roles: RoleList,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Snapshot {
    pub fn new(
        name: impl Into<String>,
        deployment_id: DeploymentId,
        barclamp_id: BarclampId,
        status: SnapshotStatus,
        roles: RoleList,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: SnapshotId::generate(),
            name: name.into(),
            deployment_id,
            barclamp_id,
            status,
            roles,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, returning the previous status.
    ///
    /// Re-entering the current status is a no-op in checked mode.
    pub fn transition(
        &mut self,
        next: SnapshotStatus,
        mode: TransitionMode,
    ) -> Result<SnapshotStatus, TransitionError> {
        let previous = self.status;
        if mode == TransitionMode::Checked
            && previous != next
            && !previous.can_transition_to(next)
        {
            return Err(TransitionError {
                from: previous,
                to: next,
            });
        }

        if previous != next {
            self.status = next;
            self.updated_at = chrono::Utc::now();
        }
        Ok(previous)
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.status.lifecycle_state()
    }
}
