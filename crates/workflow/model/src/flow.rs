//! Connecting flows: directed edges between flow nodes
//!
//! A flow without a condition is always eligible. A conditional flow is
//! eligible when its expression evaluates true against process data.

use crate::NodeId;
use serde::{Deserialize, Serialize};

/// Identifier of a connecting flow
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlowId(pub String);

impl FlowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FlowId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A directed edge of the process graph
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectingFlow {
    /// Unique identifier within the graph
    pub id: FlowId,
    /// Source node
    pub source: NodeId,
    /// Destination node
    pub target: NodeId,
    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Condition evaluated against process data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl ConnectingFlow {
    /// Create an unconditional flow
    pub fn new(id: impl Into<String>, source: NodeId, target: NodeId) -> Self {
        Self {
            id: FlowId::new(id),
            source,
            target,
            name: None,
            condition: None,
        }
    }

    /// Create a flow guarded by a condition
    pub fn conditional(
        id: impl Into<String>,
        source: NodeId,
        target: NodeId,
        condition: impl Into<String>,
    ) -> Self {
        Self::new(id, source, target).with_condition(condition)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }

    /// Display name, falling back to the identifier
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }
}
