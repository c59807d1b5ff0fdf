//! Who performed an operation.

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Actor recorded on ledger writes and reversals.
///
/// Unattended runs (the periodic scheduler) are `ScheduledSystem`, never a
/// missing user.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum Actor {
    Human(UserId),
    ScheduledSystem,
}

impl Actor {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Actor::Human(id) => Some(*id),
            Actor::ScheduledSystem => None,
        }
    }
}

impl core::fmt::Display for Actor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Actor::Human(id) => write!(f, "user:{id}"),
            Actor::ScheduledSystem => f.write_str("system:scheduler"),
        }
    }
}
