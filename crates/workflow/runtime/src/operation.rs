//! Automated execution of operational activities
//!
//! When full advancement lands on an automated task the instance asks the
//! attached [`OperationRunner`] for a participant, walks the work item
//! through allocate and start, runs the operation and completes the item.
//! No external call is needed for any of those steps.

use crate::WorkflowInstance;
use workflow_model::{FlowNode, Participant, ProcessData, WorkflowError, WorkflowResult};

/// Performs automated work on behalf of the instance
pub trait OperationRunner: Send + Sync {
    /// The participant the work item is allocated to. It must hold the
    /// node's role like any other participant.
    fn provide_participant(
        &self,
        node: &FlowNode,
        instance: &WorkflowInstance,
    ) -> WorkflowResult<Participant>;

    /// Perform the work. May read and write process data.
    fn run(&self, node: &FlowNode, data: &mut ProcessData) -> WorkflowResult<()>;
}

/// Collaborator failures surface as [`WorkflowError::Operation`]
pub(crate) fn operation_error(node: &FlowNode, error: WorkflowError) -> WorkflowError {
    match error {
        WorkflowError::Operation { .. } => error,
        other => WorkflowError::Operation {
            node: node.id.clone(),
            message: other.to_string(),
        },
    }
}
