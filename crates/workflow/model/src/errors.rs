//! Error types for the workflow engine

use crate::{FlowId, NodeId, ParticipantId, RoleId, WorkItemState};

/// Errors that can occur while building or running a workflow
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(
        "Participant '{participant}' does not have the role '{role}' required to operate node '{node}'"
    )]
    AccessDenied {
        participant: ParticipantId,
        role: RoleId,
        node: NodeId,
    },

    #[error(
        "Expected node '{expected}' to be current (current: {})",
        describe_current(.current)
    )]
    UnexpectedNode {
        expected: NodeId,
        current: Option<NodeId>,
    },

    #[error("No sequence flow can be selected on '{0}'")]
    NoFlowSelected(NodeId),

    #[error("No transition from state '{from}' on trigger '{trigger}'")]
    NoSuchTransition { from: String, trigger: String },

    #[error("State machine already started")]
    AlreadyStarted,

    #[error("State machine not started")]
    NotStarted,

    #[error("Unknown state: {0}")]
    UnknownState(String),

    #[error("Cannot evaluate expression '{expression}': {message}")]
    Expression { expression: String, message: String },

    #[error("Operation on node '{node}' failed: {message}")]
    Operation { node: NodeId, message: String },

    #[error("Routing chain from '{node}' exceeded {limit} automatic hops")]
    RoutingLoop { node: NodeId, limit: usize },

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Connecting flow not found: {0}")]
    FlowNotFound(FlowId),

    #[error("Duplicate node ID: {0}")]
    DuplicateNodeId(NodeId),

    #[error("Duplicate flow ID: {0}")]
    DuplicateFlowId(FlowId),

    #[error("Process definition is locked once execution has begun")]
    DefinitionLocked,

    #[error("Node '{0}' is not an activity")]
    NotAnActivity(NodeId),

    #[error("No work item exists for node '{0}'")]
    NoWorkItem(NodeId),

    #[error("Work item on node '{node}' cannot {action} while {state}")]
    InvalidWorkItemTransition {
        node: NodeId,
        state: WorkItemState,
        action: &'static str,
    },

    #[error("No next option matches '{0}'")]
    OptionNotFound(String),

    #[error("No start event defined")]
    NoStartEvent,

    #[error("No end event defined")]
    NoEndEvent,

    #[error("Routing nodes form a cycle through '{0}'")]
    RoutingCycle(NodeId),

    #[error("Workflow validation error: {0}")]
    ValidationError(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

fn describe_current(current: &Option<NodeId>) -> String {
    match current {
        Some(node) => format!("'{}'", node),
        None => "none".to_string(),
    }
}

/// Result type alias for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;
