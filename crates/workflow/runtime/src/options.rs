//! Next-option enumeration
//!
//! What can happen next, without changing anything: before start the
//! candidate start events, at an end event that end event alone, otherwise
//! the outgoing connecting flows of the current node in declaration order.

use serde::{Deserialize, Serialize};
use workflow_model::{ConnectingFlow, FlowNode};

/// One possible next step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NextOption {
    /// A start event the instance can be started at
    StartEvent(FlowNode),
    /// An outgoing flow of the current node
    Flow(ConnectingFlow),
    /// The end event the instance is at; there is nowhere further to go
    End(FlowNode),
}

impl NextOption {
    /// Flow id for flows, node id otherwise
    pub fn id(&self) -> &str {
        match self {
            Self::StartEvent(node) | Self::End(node) => node.id.as_str(),
            Self::Flow(flow) => flow.id.as_str(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::StartEvent(node) | Self::End(node) => node.name.as_deref(),
            Self::Flow(flow) => flow.name.as_deref(),
        }
    }

    /// Display name, falling back to the identifier
    pub fn label(&self) -> &str {
        self.name().unwrap_or_else(|| self.id())
    }

    pub fn as_flow(&self) -> Option<&ConnectingFlow> {
        match self {
            Self::Flow(flow) => Some(flow),
            _ => None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::End(_))
    }
}

/// Result of [`crate::WorkflowInstance::flow_to`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowOutcome {
    /// The flow's target became current
    Advanced,
    /// The instance is at an end event; nothing moved
    Ended,
    /// The chosen flow is its source's default flow and only non-default
    /// flows were requested; nothing moved
    DefaultSkipped,
}

/// What [`crate::WorkflowInstance::start_flow_to`] reports back
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSummary {
    /// Label of the node the instance stopped at
    pub current: Option<String>,
    /// Labels of the options available from there
    pub options: Vec<String>,
}
