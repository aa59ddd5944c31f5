//! Sequence flow resolution
//!
//! Given a node that has just become current, pick exactly one outgoing
//! connecting flow and move the state machine to its target. Routing nodes
//! are traversed automatically: while the new current node is a router the
//! selection runs again from it. The traversal is a loop bounded by
//! [`RoutingConfig::max_hops`], so a cyclic chain of routers fails with
//! [`WorkflowError::RoutingLoop`] instead of spinning.

use crate::{ConditionEvaluator, RoutingConfig, StateMachine};
use workflow_model::{
    ConnectingFlow, FlowNode, NodeId, ProcessData, ProcessGraph, WorkflowError, WorkflowResult,
};

/// Selects outgoing flows and drives routing hops
#[derive(Clone, Copy, Debug)]
pub struct SequenceFlowResolver {
    max_hops: usize,
}

impl SequenceFlowResolver {
    pub fn new(config: &RoutingConfig) -> Self {
        Self {
            max_hops: config.max_hops,
        }
    }

    /// Choose the flow leaving `node`.
    ///
    /// Flows are visited in declaration order. The node's default flow is
    /// skipped; the first unconditional flow, or the first conditional flow
    /// whose condition holds, wins. Only when nothing is chosen does the
    /// default flow apply.
    pub fn select_flow<'g>(
        &self,
        graph: &'g ProcessGraph,
        node: &FlowNode,
        data: &ProcessData,
        evaluator: &dyn ConditionEvaluator,
    ) -> WorkflowResult<&'g ConnectingFlow> {
        let default_flow = node.conditional_default();

        for flow in graph.flows_from(&node.id) {
            if Some(&flow.id) == default_flow {
                continue;
            }
            match &flow.condition {
                None => return Ok(flow),
                Some(condition) => {
                    if evaluator.evaluate(condition, data)? {
                        return Ok(flow);
                    }
                }
            }
        }

        match default_flow {
            Some(flow_id) => graph
                .flow(flow_id)
                .ok_or_else(|| WorkflowError::FlowNotFound(flow_id.clone())),
            None => Err(WorkflowError::NoFlowSelected(node.id.clone())),
        }
    }

    /// Resolve from `from` and keep going through routing nodes.
    ///
    /// Returns the nodes entered, in order. On error the machine may hold
    /// partial progress; callers resolve against a working copy and only
    /// keep it on success.
    pub fn resolve(
        &self,
        graph: &ProcessGraph,
        machine: &mut StateMachine,
        from: &NodeId,
        data: &ProcessData,
        evaluator: &dyn ConditionEvaluator,
    ) -> WorkflowResult<Vec<NodeId>> {
        let mut entered = Vec::new();
        let mut current = from.clone();
        let mut hops = 0;

        loop {
            let node = graph
                .node(&current)
                .ok_or_else(|| WorkflowError::NodeNotFound(current.clone()))?;
            let flow = self.select_flow(graph, node, data, evaluator)?;

            tracing::debug!(
                node = %node.id,
                flow = %flow.id,
                target = %flow.target,
                "Sequence flow selected"
            );
            machine.trigger(flow.target.as_str())?;
            entered.push(flow.target.clone());

            let target = graph
                .node(&flow.target)
                .ok_or_else(|| WorkflowError::NodeNotFound(flow.target.clone()))?;
            if !target.is_routing() {
                return Ok(entered);
            }

            hops += 1;
            if hops > self.max_hops {
                tracing::warn!(node = %target.id, limit = self.max_hops, "Routing hop limit exceeded");
                return Err(WorkflowError::RoutingLoop {
                    node: target.id.clone(),
                    limit: self.max_hops,
                });
            }
            current = target.id.clone();
        }
    }
}

impl Default for SequenceFlowResolver {
    fn default() -> Self {
        Self::new(&RoutingConfig::default())
    }
}
