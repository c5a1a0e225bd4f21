//! Notifications emitted by registry mutations.
//!
//! Every successful mutation produces exactly one [`Event`]: the typed
//! [`Notification`] plus the caller identity and logical clock of the call.
//! Dispatch to subscribers is left to the host; the registry only returns it.

use serde::{Deserialize, Serialize};

use crate::types::{BlockId, Identity, ProjectId, Timestamp};

/// Topic-tagged notification payload. Field sets are part of the public interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "topic")]
pub enum Notification {
    ProjectRegistered {
        project_id: ProjectId,
        creator: Identity,
        name: String,
        domain: String,
        created_at: Timestamp,
    },
    ProjectStatusUpdated {
        project_id: ProjectId,
        is_active: bool,
        timestamp: Timestamp,
    },
    BlockAdded {
        block_id: BlockId,
        project_id: ProjectId,
        creator: Identity,
        label: String,
        tag: String,
        timestamp: Timestamp,
    },
    BlockStatusUpdated {
        block_id: BlockId,
        is_active: bool,
        timestamp: Timestamp,
    },
    OwnershipTransferred {
        previous_owner: Identity,
        new_owner: Identity,
    },
}

impl Notification {
    pub fn topic(&self) -> &'static str {
        match self {
            Notification::ProjectRegistered { .. } => "ProjectRegistered",
            Notification::ProjectStatusUpdated { .. } => "ProjectStatusUpdated",
            Notification::BlockAdded { .. } => "BlockAdded",
            Notification::BlockStatusUpdated { .. } => "BlockStatusUpdated",
            Notification::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }
}

/// A notification together with the ambient context of the call that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub caller: Identity,
    pub clock: Timestamp,
    pub notification: Notification,
}

/// Result of a successful mutation: the primary value and the emitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt<T> {
    pub value: T,
    pub event: Event,
}

impl<T> Receipt<T> {
    pub(crate) fn new(
        value: T,
        caller: &Identity,
        clock: Timestamp,
        notification: Notification,
    ) -> Self {
        Self {
            value,
            event: Event {
                caller: caller.clone(),
                clock,
                notification,
            },
        }
    }

    /// Discard the event, keeping only the value.
    pub fn into_value(self) -> T {
        self.value
    }
}
