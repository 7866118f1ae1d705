//! Lifecycle events that drive the per-tenant indexes.

use crate::model::{EntityId, PartitionId};
use serde::{Deserialize, Serialize};

/// A change to an entity's profile membership.
///
/// When `partition` is omitted it is resolved from the member id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MembershipEvent {
    /// Entity created or attached to a profile
    Assigned {
        profile: EntityId,
        member: EntityId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        partition: Option<PartitionId>,
    },
    /// Entity switched from one profile to another
    ProfileChanged {
        from: EntityId,
        to: EntityId,
        member: EntityId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        partition: Option<PartitionId>,
    },
    /// Entity detached from a profile
    Unassigned {
        profile: EntityId,
        member: EntityId,
    },
    /// Entity deleted outright
    EntityDeleted {
        entity: EntityId,
    },
    /// Profile entity deleted; its members are not re-homed
    ProfileDeleted {
        profile: EntityId,
    },
}

impl MembershipEvent {
    /// Profile key the event would register a membership under, if any.
    ///
    /// Only assignments and profile changes add memberships; removals return
    /// `None`.
    pub fn profile_key(&self) -> Option<&EntityId> {
        match self {
            MembershipEvent::Assigned { profile, .. } => Some(profile),
            MembershipEvent::ProfileChanged { to, .. } => Some(to),
            MembershipEvent::Unassigned { .. }
            | MembershipEvent::EntityDeleted { .. }
            | MembershipEvent::ProfileDeleted { .. } => None,
        }
    }
}
