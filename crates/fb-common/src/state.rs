//! Lifecycle states of a function block instance.
//!
//! CREATED → INITIALIZED, with FAILED as a terminal state reachable from
//! both. Re-initializing an initialized instance is allowed and does not
//! preserve prior buffer contents.

use crate::error::{FbError, FbResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one function block instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FbState {
    /// Constructed; buffers not yet allocated.
    #[default]
    Created,
    /// Buffers allocated; events may be executed.
    Initialized,
    /// Initialization failed; the instance is unusable.
    Failed,
}

impl fmt::Display for FbState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Initialized => write!(f, "INITIALIZED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl FbState {
    /// Check if a transition to `target` is valid from the current state.
    #[must_use]
    pub fn can_transition_to(&self, target: FbState) -> bool {
        use FbState::{Created, Failed, Initialized};

        matches!(
            (self, target),
            (Created, Initialized)
                | (Created, Failed)
                | (Initialized, Initialized)
                | (Initialized, Failed)
        )
    }

    /// Attempt to transition to `target`, returning error if invalid.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::InvalidStateTransition`] for edges outside the lifecycle.
    pub fn transition_to(&mut self, target: FbState) -> FbResult<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(FbError::InvalidStateTransition {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }

    /// Returns true if the instance accepts events.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Initialized)
    }
}
