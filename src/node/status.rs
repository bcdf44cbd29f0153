//! Node lifecycle state machine
//!
//! ```text
//!            activate              enter_maintenance
//! ┌──────────┐ ────────▶ ┌────────┐ ────────────────▶ ┌─────────────┐
//! │ Inactive │           │ Active │                   │ Maintenance │
//! └──────────┘ ◀──────── └────────┘ ◀──────────────── └─────────────┘
//!      ▲      deactivate               exit_maintenance      │
//!      └─────────────────────────────────────────────────────┘
//!                          deactivate
//! ```
//!
//! Self-transitions and `Inactive → Maintenance` are illegal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TransitionError, ValidationError};

/// Lifecycle status of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Not serving subscribers (initial state)
    #[default]
    Inactive,
    /// Serving subscribers
    Active,
    /// Temporarily withdrawn for maintenance
    Maintenance,
}

impl NodeStatus {
    /// All statuses
    pub const ALL: [Self; 3] = [Self::Inactive, Self::Active, Self::Maintenance];

    /// Status name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Maintenance => "maintenance",
        }
    }

    /// Check whether moving to `target` is a legal transition
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (*self, target),
            (Self::Inactive, Self::Active)
                | (Self::Active, Self::Inactive)
                | (Self::Active, Self::Maintenance)
                | (Self::Maintenance, Self::Active)
                | (Self::Maintenance, Self::Inactive)
        )
    }

    /// Validate a transition to `target`
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` for illegal transitions.
    pub fn validate_transition(&self, target: Self) -> Result<(), TransitionError> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(TransitionError {
                from: *self,
                to: target,
            })
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inactive" => Ok(Self::Inactive),
            "active" => Ok(Self::Active),
            "maintenance" => Ok(Self::Maintenance),
            other => Err(ValidationError::InvalidRecord(format!("unknown status '{other}'"))),
        }
    }
}
