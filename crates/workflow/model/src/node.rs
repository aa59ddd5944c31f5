//! Flow nodes: the vertices of a process graph
//!
//! Every node has a closed [`NodeKind`]. The runtime never switches on the
//! concrete kind when a capability query answers the question: routing
//! nodes are traversed automatically, activity nodes carry work items,
//! end events terminate the instance.

use crate::{FlowId, RoleId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Identifier ───────────────────────────────────────────────────────

/// Identifier of a flow node, unique within a process graph
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ── Node Kind ────────────────────────────────────────────────────────

/// The kind of a flow node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Entry point, reached from the synthetic initial state
    StartEvent,
    /// Terminal node; the instance ends when one is reached
    EndEvent,
    /// Work performed by a human participant
    HumanTask,
    /// Work performed by the automated-execution collaborator
    AutomatedTask,
    /// Routes to exactly one outgoing flow chosen by condition
    ExclusiveRouter,
    /// Routes without evaluating work; traversed like any other router
    ParallelRouter,
}

impl NodeKind {
    /// Tasks carry work items
    pub fn is_activity(&self) -> bool {
        matches!(self, Self::HumanTask | Self::AutomatedTask)
    }

    /// Automated tasks are run without an external trigger
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::AutomatedTask)
    }

    /// Routers are traversed without external input
    pub fn is_routing(&self) -> bool {
        matches!(self, Self::ExclusiveRouter | Self::ParallelRouter)
    }

    /// Kinds that honour a declared default flow
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            Self::ExclusiveRouter | Self::ParallelRouter | Self::HumanTask | Self::AutomatedTask
        )
    }

    pub fn is_start(&self) -> bool {
        matches!(self, Self::StartEvent)
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::EndEvent)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::StartEvent => "start event",
            Self::EndEvent => "end event",
            Self::HumanTask => "human task",
            Self::AutomatedTask => "automated task",
            Self::ExclusiveRouter => "exclusive router",
            Self::ParallelRouter => "parallel router",
        };
        f.write_str(label)
    }
}

// ── Flow Node ────────────────────────────────────────────────────────

/// A vertex of the process graph
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    /// Unique identifier within the graph
    pub id: NodeId,
    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// What the node does
    pub kind: NodeKind,
    /// The role required to operate work on this node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleId>,
    /// Fallback flow taken when no other outgoing flow is selected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_flow: Option<FlowId>,
    /// Metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl FlowNode {
    /// Create a new flow node
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(id),
            name: None,
            kind,
            role: None,
            default_flow: None,
            metadata: HashMap::new(),
        }
    }

    /// Create a start event
    pub fn start_event(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::StartEvent)
    }

    /// Create an end event
    pub fn end_event(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::EndEvent)
    }

    /// Create a human task
    pub fn human_task(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, NodeKind::HumanTask).with_name(name)
    }

    /// Create an automated task
    pub fn automated_task(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, NodeKind::AutomatedTask).with_name(name)
    }

    /// Create an exclusive router
    pub fn exclusive_router(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::ExclusiveRouter)
    }

    /// Create a parallel router
    pub fn parallel_router(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::ParallelRouter)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: RoleId) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_default_flow(mut self, flow: FlowId) -> Self {
        self.default_flow = Some(flow);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Display name, falling back to the identifier
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    /// The role governing work on this node; unassigned nodes fall back to
    /// [`RoleId::default_role`]
    pub fn effective_role(&self) -> RoleId {
        self.role.clone().unwrap_or_else(RoleId::default_role)
    }

    /// The default flow, if this kind honours one
    pub fn conditional_default(&self) -> Option<&FlowId> {
        if self.kind.is_conditional() {
            self.default_flow.as_ref()
        } else {
            None
        }
    }

    pub fn is_activity(&self) -> bool {
        self.kind.is_activity()
    }

    pub fn is_operational(&self) -> bool {
        self.kind.is_operational()
    }

    pub fn is_routing(&self) -> bool {
        self.kind.is_routing()
    }

    pub fn is_start(&self) -> bool {
        self.kind.is_start()
    }

    pub fn is_end(&self) -> bool {
        self.kind.is_end()
    }
}
