//! Process graph: the definition a workflow instance runs against
//!
//! The graph is pure data. Nodes and flows are kept in declaration order;
//! [`ProcessGraph::flows_from`] preserves that order because the resolver
//! uses it as the tie-break between eligible flows.

use crate::{
    ConnectingFlow, FlowId, FlowNode, NodeId, Role, RoleId, WorkflowError, WorkflowResult,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Nodes, connecting flows and roles of a process definition
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessGraph {
    pub nodes: Vec<FlowNode>,
    pub flows: Vec<ConnectingFlow>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl ProcessGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: FlowNode) -> WorkflowResult<()> {
        if self.nodes.iter().any(|n| n.id == node.id) {
            return Err(WorkflowError::DuplicateNodeId(node.id));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Add a connecting flow; both endpoints must already exist
    pub fn add_edge(&mut self, flow: ConnectingFlow) -> WorkflowResult<()> {
        if !self.nodes.iter().any(|n| n.id == flow.source) {
            return Err(WorkflowError::NodeNotFound(flow.source));
        }
        if !self.nodes.iter().any(|n| n.id == flow.target) {
            return Err(WorkflowError::NodeNotFound(flow.target));
        }
        if self.flows.iter().any(|f| f.id == flow.id) {
            return Err(WorkflowError::DuplicateFlowId(flow.id));
        }
        self.flows.push(flow);
        Ok(())
    }

    /// Add or replace a role
    pub fn add_role(&mut self, role: Role) {
        match self.roles.iter_mut().find(|r| r.id == role.id) {
            Some(existing) => *existing = role,
            None => self.roles.push(role),
        }
    }

    pub fn node(&self, id: &NodeId) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn flow(&self, id: &FlowId) -> Option<&ConnectingFlow> {
        self.flows.iter().find(|f| &f.id == id)
    }

    pub fn role(&self, id: &RoleId) -> Option<&Role> {
        self.roles.iter().find(|r| &r.id == id)
    }

    pub fn has_role(&self, id: &RoleId) -> bool {
        self.role(id).is_some()
    }

    /// Outgoing flows of a node, in declaration order
    pub fn flows_from(&self, node_id: &NodeId) -> Vec<&ConnectingFlow> {
        self.flows.iter().filter(|f| &f.source == node_id).collect()
    }

    /// Incoming flows of a node, in declaration order
    pub fn flows_into(&self, node_id: &NodeId) -> Vec<&ConnectingFlow> {
        self.flows.iter().filter(|f| &f.target == node_id).collect()
    }

    pub fn start_events(&self) -> Vec<&FlowNode> {
        self.nodes.iter().filter(|n| n.is_start()).collect()
    }

    pub fn end_events(&self) -> Vec<&FlowNode> {
        self.nodes.iter().filter(|n| n.is_end()).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    /// Validate the graph for structural correctness
    pub fn validate(&self) -> WorkflowResult<()> {
        if self.start_events().is_empty() {
            return Err(WorkflowError::NoStartEvent);
        }
        if self.end_events().is_empty() {
            return Err(WorkflowError::NoEndEvent);
        }

        for flow in &self.flows {
            if self.node(&flow.source).is_none() {
                return Err(WorkflowError::NodeNotFound(flow.source.clone()));
            }
            if self.node(&flow.target).is_none() {
                return Err(WorkflowError::NodeNotFound(flow.target.clone()));
            }
        }

        for node in &self.nodes {
            if let Some(default_id) = &node.default_flow {
                let flow = self
                    .flow(default_id)
                    .ok_or_else(|| WorkflowError::FlowNotFound(default_id.clone()))?;
                if flow.source != node.id {
                    return Err(WorkflowError::ValidationError(format!(
                        "default flow '{}' of node '{}' starts at '{}'",
                        default_id, node.id, flow.source
                    )));
                }
            }
            if node.is_start() && !self.flows_into(&node.id).is_empty() {
                return Err(WorkflowError::ValidationError(format!(
                    "start event '{}' has incoming flows",
                    node.id
                )));
            }
            if node.is_routing() && self.flows_from(&node.id).is_empty() {
                return Err(WorkflowError::ValidationError(format!(
                    "routing node '{}' has no outgoing flows",
                    node.id
                )));
            }
        }

        if let Some(node) = self.routing_cycle() {
            return Err(WorkflowError::RoutingCycle(node));
        }

        let reachable = self.reachable_from_starts();
        for node in &self.nodes {
            if !reachable.contains(&node.id) {
                return Err(WorkflowError::ValidationError(format!(
                    "node '{}' is unreachable from any start event",
                    node.id
                )));
            }
        }

        Ok(())
    }

    /// Find a cycle made only of routing nodes, which automatic traversal
    /// could never leave
    fn routing_cycle(&self) -> Option<NodeId> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: HashMap<&NodeId, Mark> = HashMap::new();
        for root in self.nodes.iter().filter(|n| n.is_routing()) {
            if marks.contains_key(&root.id) {
                continue;
            }
            // Iterative DFS: (node, index of next outgoing flow to inspect)
            let mut stack: Vec<(&NodeId, usize)> = vec![(&root.id, 0)];
            marks.insert(&root.id, Mark::Visiting);
            while let Some((node_id, next)) = stack.pop() {
                let successors: Vec<&NodeId> = self
                    .flows_from(node_id)
                    .into_iter()
                    .map(|f| &f.target)
                    .filter(|t| self.node(t).map(|n| n.is_routing()).unwrap_or(false))
                    .collect();
                match successors.get(next) {
                    Some(&succ) => {
                        stack.push((node_id, next + 1));
                        match marks.get(succ) {
                            Some(Mark::Visiting) => return Some(succ.clone()),
                            Some(Mark::Done) => {}
                            None => {
                                marks.insert(succ, Mark::Visiting);
                                stack.push((succ, 0));
                            }
                        }
                    }
                    None => {
                        marks.insert(node_id, Mark::Done);
                    }
                }
            }
        }
        None
    }

    fn reachable_from_starts(&self) -> HashSet<NodeId> {
        let mut visited = HashSet::new();
        let mut queue: Vec<NodeId> = self.start_events().iter().map(|n| n.id.clone()).collect();

        while let Some(current) = queue.pop() {
            if visited.insert(current.clone()) {
                for flow in self.flows_from(&current) {
                    if !visited.contains(&flow.target) {
                        queue.push(flow.target.clone());
                    }
                }
            }
        }

        visited
    }
}
