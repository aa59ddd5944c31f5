//! Roles and participants
//!
//! Work on an activity node may only be performed by a participant that is
//! authorized for the node's role. A participant is authorized when it holds
//! the role itself, or when the role's member list names it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role assumed by nodes that do not declare one
pub const DEFAULT_ROLE_ID: &str = "__ROLE__";

/// Unique identifier for a role
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleId(pub String);

impl RoleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn default_role() -> Self {
        Self::new(DEFAULT_ROLE_ID)
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a participant
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A role declared by a process definition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Participants admitted to the role regardless of the roles they hold
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub members: BTreeSet<ParticipantId>,
}

impl Role {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: RoleId::new(id),
            name: None,
            members: BTreeSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_member(mut self, participant: ParticipantId) -> Self {
        self.members.insert(participant);
        self
    }

    pub fn admits(&self, participant: &ParticipantId) -> bool {
        self.members.contains(participant)
    }
}

/// Someone (or something) performing work items
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    #[serde(default)]
    pub roles: BTreeSet<RoleId>,
}

impl Participant {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(id),
            roles: BTreeSet::new(),
        }
    }

    pub fn with_role(mut self, role: RoleId) -> Self {
        self.roles.insert(role);
        self
    }

    pub fn has_role(&self, role: &RoleId) -> bool {
        self.roles.contains(role)
    }
}
