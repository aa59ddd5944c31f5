//! Work item lifecycle management
//!
//! Every traversal of an activity node creates one [`WorkItem`]. Actions on
//! it are checked in a fixed order: the participant must be authorized for
//! the node's role, the node must be the current node, and the item must be
//! in the state the action expects.

use serde::{Deserialize, Serialize};
use workflow_model::{
    FlowNode, NodeId, Participant, ProcessGraph, WorkItem, WorkflowError, WorkflowResult,
};

/// All work items of one instance, oldest first
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkItemLedger {
    items: Vec<WorkItem>,
}

impl WorkItemLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a fresh item to `node`
    pub fn create(&mut self, node: &NodeId) -> &WorkItem {
        tracing::debug!(node = %node, "Work item created");
        let index = self.items.len();
        self.items.push(WorkItem::new(node.clone()));
        &self.items[index]
    }

    /// The item for the most recent traversal of `node`
    pub fn latest(&self, node: &NodeId) -> Option<&WorkItem> {
        self.items.iter().rev().find(|item| &item.node_id == node)
    }

    /// Items for every traversal of `node`, oldest first
    pub fn for_node<'a>(&'a self, node: &'a NodeId) -> impl Iterator<Item = &'a WorkItem> + 'a {
        self.items.iter().filter(move |item| &item.node_id == node)
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn allocate(
        &mut self,
        graph: &ProcessGraph,
        current: Option<&NodeId>,
        node: &FlowNode,
        participant: &Participant,
    ) -> WorkflowResult<()> {
        let item = self.guard(graph, current, node, participant)?;
        item.allocate(participant.id.clone())?;
        tracing::debug!(node = %node.id, participant = %participant.id, "Work item allocated");
        Ok(())
    }

    pub fn start(
        &mut self,
        graph: &ProcessGraph,
        current: Option<&NodeId>,
        node: &FlowNode,
        participant: &Participant,
    ) -> WorkflowResult<()> {
        let item = self.guard(graph, current, node, participant)?;
        item.start()?;
        tracing::debug!(node = %node.id, participant = %participant.id, "Work item started");
        Ok(())
    }

    pub fn complete(
        &mut self,
        graph: &ProcessGraph,
        current: Option<&NodeId>,
        node: &FlowNode,
        participant: &Participant,
    ) -> WorkflowResult<()> {
        let item = self.guard(graph, current, node, participant)?;
        item.complete(participant.id.clone())?;
        tracing::debug!(node = %node.id, participant = %participant.id, "Work item completed");
        Ok(())
    }

    fn guard(
        &mut self,
        graph: &ProcessGraph,
        current: Option<&NodeId>,
        node: &FlowNode,
        participant: &Participant,
    ) -> WorkflowResult<&mut WorkItem> {
        if !node.is_activity() {
            return Err(WorkflowError::NotAnActivity(node.id.clone()));
        }
        authorize(graph, node, participant)?;
        expect_current(node, current)?;
        self.items
            .iter_mut()
            .rev()
            .find(|item| item.node_id == node.id)
            .ok_or_else(|| WorkflowError::NoWorkItem(node.id.clone()))
    }
}

/// A participant may operate a node when it holds the node's role, or when
/// the graph's definition of that role lists it as a member
pub fn authorize(
    graph: &ProcessGraph,
    node: &FlowNode,
    participant: &Participant,
) -> WorkflowResult<()> {
    let role = node.effective_role();
    let admitted = participant.has_role(&role)
        || graph
            .role(&role)
            .map(|r| r.admits(&participant.id))
            .unwrap_or(false);
    if admitted {
        return Ok(());
    }

    tracing::warn!(
        node = %node.id,
        participant = %participant.id,
        role = %role,
        "Access denied"
    );
    Err(WorkflowError::AccessDenied {
        participant: participant.id.clone(),
        role,
        node: node.id.clone(),
    })
}

fn expect_current(node: &FlowNode, current: Option<&NodeId>) -> WorkflowResult<()> {
    if current == Some(&node.id) {
        return Ok(());
    }
    tracing::warn!(expected = %node.id, "Node is not current");
    Err(WorkflowError::UnexpectedNode {
        expected: node.id.clone(),
        current: current.cloned(),
    })
}
