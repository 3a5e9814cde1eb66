//! Service instance state machine.
//!
//! # States
//! - Parsed: constructed, no lifecycle event yet
//! - Installing: populating the bucket of this version
//! - Installed: populated, waiting to become authoritative
//! - Activating: claiming clients, reclaiming stale buckets
//! - Active: serving requests
//! - Failed: install or activation aborted
//! - Redundant: superseded by a newer instance
//!
//! # State Transitions
//! ```text
//! Parsed → Installing → Installed → Activating → Active
//!              │            │            │          │
//!              ▼            ▼            ▼          ▼
//!            Failed     Redundant      Failed   Redundant
//! ```
//!
//! # Design Decisions
//! - Failed and Redundant are terminal
//! - An instance never goes back to an earlier state

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Active,
    Failed,
    Redundant,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Failed => "failed",
            LifecycleState::Redundant => "redundant",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Failed | LifecycleState::Redundant)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Parsed, Installing)
                | (Installing, Installed)
                | (Installing, Failed)
                | (Installed, Activating)
                | (Installed, Redundant)
                | (Activating, Active)
                | (Activating, Failed)
                | (Active, Redundant)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
