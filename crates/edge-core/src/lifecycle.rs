//! Worker lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of one deployed worker version.
///
/// ```text
/// Installing -> Waiting -> Active -> Superseded
///      \
///       -> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Pre-caching the static manifest.
    Installing,
    /// Installed, eligible for activation.
    Waiting,
    /// Controlling clients and answering intercepted requests.
    Active,
    /// Replaced by a newer deployment version.
    Superseded,
    /// Install could not complete; never activates.
    Failed,
}

impl WorkerState {
    /// Whether moving to `next` is a legal transition.
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;

        matches!(
            (self, next),
            (Installing, Waiting)
                | (Installing, Failed)
                | (Waiting, Active)
                | (Waiting, Superseded)
                | (Active, Superseded)
        )
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Superseded | Self::Failed)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installing => write!(f, "installing"),
            Self::Waiting => write!(f, "waiting"),
            Self::Active => write!(f, "active"),
            Self::Superseded => write!(f, "superseded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
