//! Workflow instance: the façade that drives one process from start to end
//!
//! The instance owns the process graph, the state machine built from it,
//! process data, work items and timestamps, and holds the two collaborators
//! (condition evaluator and operation runner).
//!
//! Operations either commit fully or leave the instance as it was:
//! resolution runs on a working copy of the state machine (and of the work
//! item ledger where items change) which replaces the live one only on
//! success. The exception is automated execution. Once an automated task's
//! work item has been started, a failing run leaves the item `Started` and
//! keeps the transitions that led there.

use crate::{
    activity_log, operation::operation_error, ActivityLogEntry, ConditionEvaluator,
    EngineConfig, ExpressionEvaluator, FlowOutcome, NextOption, OperationRunner,
    SequenceFlowResolver, StartSummary, StateMachine, StateMachineBuilder, TransitionLogEntry,
    WorkItemLedger, FINAL_STATE, INITIAL_STATE,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use workflow_model::{
    ConnectingFlow, FlowId, FlowNode, NodeId, Participant, ProcessData, ProcessGraph, Role,
    WorkItem, WorkItemState, WorkflowError, WorkflowResult,
};

/// Unique identifier for a workflow instance
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowInstanceId(pub String);

impl WorkflowInstanceId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, cut on a character boundary
    pub fn short(&self) -> &str {
        self.0
            .char_indices()
            .nth(8)
            .map_or(self.0.as_str(), |(end, _)| &self.0[..end])
    }
}

impl std::fmt::Display for WorkflowInstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Advancement {
    /// Create work items and run automated ones
    Full,
    /// Create work items only; automated work is left to the caller
    Deferred,
}

/// A running (or not yet started) process instance
pub struct WorkflowInstance {
    pub(crate) id: WorkflowInstanceId,
    pub(crate) name: String,
    pub(crate) graph: Arc<ProcessGraph>,
    pub(crate) machine: Option<StateMachine>,
    pub(crate) process_data: ProcessData,
    pub(crate) work_items: WorkItemLedger,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) ended_at: Option<DateTime<Utc>>,
    pub(crate) config: EngineConfig,
    pub(crate) evaluator: Arc<dyn ConditionEvaluator>,
    pub(crate) operation_runner: Option<Arc<dyn OperationRunner>>,
}

impl std::fmt::Debug for WorkflowInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowInstance")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("current", &self.current_node_id())
            .field("started_at", &self.started_at)
            .field("ended_at", &self.ended_at)
            .field("has_operation_runner", &self.operation_runner.is_some())
            .finish_non_exhaustive()
    }
}

impl WorkflowInstance {
    /// Create an instance with a generated id and an empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(WorkflowInstanceId::generate(), name)
    }

    pub fn with_id(id: WorkflowInstanceId, name: impl Into<String>) -> Self {
        Self::assemble(id, name.into(), Arc::new(ProcessGraph::new()))
    }

    /// Create an instance over a graph shared with other instances. The
    /// graph is copied only if this instance mutates it.
    pub fn from_graph(name: impl Into<String>, graph: Arc<ProcessGraph>) -> Self {
        Self::assemble(WorkflowInstanceId::generate(), name.into(), graph)
    }

    fn assemble(id: WorkflowInstanceId, name: String, graph: Arc<ProcessGraph>) -> Self {
        Self {
            id,
            name,
            graph,
            machine: None,
            process_data: ProcessData::new(),
            work_items: WorkItemLedger::new(),
            started_at: None,
            ended_at: None,
            config: EngineConfig::default(),
            evaluator: Arc::new(ExpressionEvaluator::new()),
            operation_runner: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id(&self) -> &WorkflowInstanceId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &ProcessGraph {
        &self.graph
    }

    pub fn shared_graph(&self) -> Arc<ProcessGraph> {
        Arc::clone(&self.graph)
    }

    pub fn state_machine(&self) -> Option<&StateMachine> {
        self.machine.as_ref()
    }

    // ── Definition ───────────────────────────────────────────────────

    pub fn add_node(&mut self, node: FlowNode) -> WorkflowResult<()> {
        self.graph_mut()?.add_node(node)
    }

    pub fn add_edge(&mut self, flow: ConnectingFlow) -> WorkflowResult<()> {
        self.graph_mut()?.add_edge(flow)
    }

    pub fn add_role(&mut self, role: Role) -> WorkflowResult<()> {
        self.graph_mut()?.add_role(role);
        Ok(())
    }

    fn graph_mut(&mut self) -> WorkflowResult<&mut ProcessGraph> {
        if self.machine.is_some() {
            return Err(WorkflowError::DefinitionLocked);
        }
        Ok(Arc::make_mut(&mut self.graph))
    }

    // ── Collaborators & data ─────────────────────────────────────────

    pub fn set_condition_evaluator(&mut self, evaluator: Arc<dyn ConditionEvaluator>) {
        self.evaluator = evaluator;
    }

    pub fn set_operation_runner(&mut self, runner: Arc<dyn OperationRunner>) {
        self.operation_runner = Some(runner);
    }

    /// Replace process data wholesale
    pub fn set_process_data(&mut self, data: ProcessData) {
        self.process_data = data;
    }

    pub fn process_data(&self) -> &ProcessData {
        &self.process_data
    }

    pub fn process_data_mut(&mut self) -> &mut ProcessData {
        &mut self.process_data
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start at `start_event`, resolve onwards and run what can be run
    pub fn start(&mut self, start_event: &NodeId) -> WorkflowResult<()> {
        let mut machine = self.prepared_machine()?;
        machine.start()?;
        machine.trigger(start_event.as_str())?;
        self.resolver().resolve(
            &self.graph,
            &mut machine,
            start_event,
            &self.process_data,
            self.evaluator.as_ref(),
        )?;

        self.machine = Some(machine);
        self.started_at = Some(Utc::now());
        tracing::info!(
            instance = %self.id,
            start = %start_event,
            "Workflow instance started"
        );
        self.advance(Advancement::Full)
    }

    /// Start at `start_event` and take its first outgoing flow without
    /// evaluating conditions. Automated work is not run.
    pub fn start_flow_to(&mut self, start_event: &NodeId) -> WorkflowResult<StartSummary> {
        let mut machine = self.prepared_machine()?;
        machine.start()?;
        machine.trigger(start_event.as_str())?;
        let target = self
            .graph
            .flows_from(start_event)
            .first()
            .map(|flow| flow.target.clone())
            .ok_or_else(|| WorkflowError::NoFlowSelected(start_event.clone()))?;
        machine.trigger(target.as_str())?;

        self.machine = Some(machine);
        self.started_at = Some(Utc::now());
        tracing::info!(
            instance = %self.id,
            start = %start_event,
            target = %target,
            "Workflow instance started"
        );
        self.advance(Advancement::Deferred)?;

        Ok(StartSummary {
            current: self.current_node().map(|node| node.label().to_string()),
            options: self.next_option_names(),
        })
    }

    /// Complete the current activity's work item on behalf of
    /// `participant`, then resolve onwards. An item that is still
    /// `Created` or `Allocated` is walked through the missing steps first.
    pub fn complete_task(&mut self, participant: &Participant) -> WorkflowResult<()> {
        let node = self
            .current_node()
            .cloned()
            .ok_or(WorkflowError::NotStarted)?;
        if !node.is_activity() {
            return Err(WorkflowError::NotAnActivity(node.id));
        }

        let mut items = self.work_items.clone();
        let current = Some(&node.id);
        match items.latest(&node.id).map(|item| item.state) {
            Some(WorkItemState::Created) => {
                items.allocate(&self.graph, current, &node, participant)?;
                items.start(&self.graph, current, &node, participant)?;
            }
            Some(WorkItemState::Allocated) => {
                items.start(&self.graph, current, &node, participant)?;
            }
            _ => {}
        }

        self.complete_and_resolve(items, &node, participant)?;
        self.advance(Advancement::Full)
    }

    pub fn allocate_work_item(
        &mut self,
        node: &NodeId,
        participant: &Participant,
    ) -> WorkflowResult<()> {
        let current = self.current_node_id();
        let flow_node = self
            .graph
            .node(node)
            .ok_or_else(|| WorkflowError::NodeNotFound(node.clone()))?;
        self.work_items
            .allocate(&self.graph, current.as_ref(), flow_node, participant)
    }

    pub fn start_work_item(
        &mut self,
        node: &NodeId,
        participant: &Participant,
    ) -> WorkflowResult<()> {
        let current = self.current_node_id();
        let flow_node = self
            .graph
            .node(node)
            .ok_or_else(|| WorkflowError::NodeNotFound(node.clone()))?;
        self.work_items
            .start(&self.graph, current.as_ref(), flow_node, participant)
    }

    /// Complete a started work item, then resolve onwards
    pub fn complete_work_item(
        &mut self,
        node: &NodeId,
        participant: &Participant,
    ) -> WorkflowResult<()> {
        let flow_node = self
            .graph
            .node(node)
            .cloned()
            .ok_or_else(|| WorkflowError::NodeNotFound(node.clone()))?;
        let items = self.work_items.clone();
        self.complete_and_resolve(items, &flow_node, participant)?;
        self.advance(Advancement::Full)
    }

    /// Take one of the current node's outgoing flows by hand.
    ///
    /// With `flow` unset the sole option is taken; several options are
    /// ambiguous and fail with [`WorkflowError::NoFlowSelected`]. With
    /// `only_non_default` a default flow is reported back instead of taken.
    pub fn flow_to(
        &mut self,
        flow: Option<&FlowId>,
        only_non_default: bool,
    ) -> WorkflowResult<FlowOutcome> {
        let current = self
            .current_node()
            .cloned()
            .ok_or(WorkflowError::NotStarted)?;
        if current.is_end() {
            return Ok(FlowOutcome::Ended);
        }

        let mut options = self.next_options();
        let chosen = match flow {
            Some(id) => options
                .into_iter()
                .find(|option| option.id() == id.as_str())
                .ok_or_else(|| WorkflowError::OptionNotFound(id.to_string()))?,
            None if options.len() == 1 => options.remove(0),
            None => return Err(WorkflowError::NoFlowSelected(current.id)),
        };
        let chosen = match chosen {
            NextOption::Flow(flow) => flow,
            NextOption::End(_) => return Ok(FlowOutcome::Ended),
            NextOption::StartEvent(node) => return Err(WorkflowError::NoFlowSelected(node.id)),
        };

        if only_non_default && current.default_flow.as_ref() == Some(&chosen.id) {
            tracing::debug!(
                instance = %self.id,
                flow = %chosen.id,
                "Default flow skipped"
            );
            return Ok(FlowOutcome::DefaultSkipped);
        }

        let mut machine = self.live_machine()?.clone();
        machine.trigger(chosen.target.as_str())?;
        self.machine = Some(machine);
        tracing::debug!(
            instance = %self.id,
            flow = %chosen.id,
            target = %chosen.target,
            "Flowed to"
        );
        self.advance(Advancement::Deferred)?;
        Ok(FlowOutcome::Advanced)
    }

    /// Make `node` current unconditionally. Nothing is resolved, no work
    /// item is created and the transition log is left alone.
    ///
    /// Landing on an activity this way leaves it without a work item, so
    /// [`Self::complete_task`] and the work item calls fail with
    /// `NoWorkItem` there. Continue with [`Self::flow_to`] instead.
    pub fn jump_to(&mut self, node: &NodeId) -> WorkflowResult<()> {
        if self.graph.node(node).is_none() {
            return Err(WorkflowError::NodeNotFound(node.clone()));
        }
        let mut machine = self.prepared_machine()?;
        machine.jump_to(node.as_str())?;
        self.machine = Some(machine);
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        tracing::warn!(instance = %self.id, node = %node, "Jumped to node");
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// The node the instance is at. After the end this is the end event
    /// that was reached.
    pub fn current_node(&self) -> Option<&FlowNode> {
        self.current_node_id()
            .and_then(|id| self.graph.node(&id))
    }

    /// The node before the most recent transition. After the end this is
    /// the node that led into the end event.
    pub fn previous_node(&self) -> Option<&FlowNode> {
        let state = self.machine.as_ref()?.previous_state()?;
        self.state_node(state)
    }

    pub fn is_active(&self) -> bool {
        self.machine.as_ref().map_or(false, StateMachine::is_active)
    }

    pub fn is_ended(&self) -> bool {
        self.machine.as_ref().map_or(false, StateMachine::is_ended)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn transition_log(&self) -> &[TransitionLogEntry] {
        self.machine
            .as_ref()
            .map(|machine| machine.transition_log())
            .unwrap_or(&[])
    }

    /// Activity visits in order, each paired with its work item
    pub fn activity_log(&self) -> Vec<ActivityLogEntry> {
        activity_log::project(&self.graph, self.transition_log(), &self.work_items)
    }

    /// The work item of the most recent visit to `node`
    pub fn work_item(&self, node: &NodeId) -> Option<&WorkItem> {
        self.work_items.latest(node)
    }

    pub fn work_items(&self) -> &[WorkItem] {
        self.work_items.items()
    }

    pub fn next_options(&self) -> Vec<NextOption> {
        match self.current_node() {
            None => self
                .graph
                .start_events()
                .into_iter()
                .cloned()
                .map(NextOption::StartEvent)
                .collect(),
            Some(node) if node.is_end() => vec![NextOption::End(node.clone())],
            Some(node) => self
                .graph
                .flows_from(&node.id)
                .into_iter()
                .cloned()
                .map(NextOption::Flow)
                .collect(),
        }
    }

    /// Labels of [`Self::next_options`], names falling back to ids
    pub fn next_option_names(&self) -> Vec<String> {
        self.next_options()
            .iter()
            .map(|option| option.label().to_string())
            .collect()
    }

    /// The next option with identifier `id` (flow id, or node id for
    /// start and end events)
    pub fn option_by_id(&self, id: &str) -> Option<NextOption> {
        self.next_options()
            .into_iter()
            .find(|option| option.id() == id)
    }

    /// The next option named `name`. A flow also matches by the name of
    /// the node it leads to.
    pub fn option_by_name(&self, name: &str) -> Option<NextOption> {
        self.next_options().into_iter().find(|option| {
            option.name() == Some(name)
                || option
                    .as_flow()
                    .and_then(|flow| self.graph.node(&flow.target))
                    .and_then(|node| node.name.as_deref())
                    == Some(name)
        })
    }

    // ── Internals ────────────────────────────────────────────────────

    fn resolver(&self) -> SequenceFlowResolver {
        SequenceFlowResolver::new(&self.config.routing)
    }

    fn build_machine(&self) -> WorkflowResult<StateMachine> {
        if self.config.validate_on_start {
            self.graph.validate()?;
        }

        let mut builder = StateMachineBuilder::new(self.id.as_str());
        for node in &self.graph.nodes {
            builder.add_state(node.id.as_str());
        }
        for start in self.graph.start_events() {
            builder.add_transition(INITIAL_STATE, start.id.as_str(), start.id.as_str());
        }
        for flow in &self.graph.flows {
            builder.add_transition(
                flow.source.as_str(),
                flow.target.as_str(),
                flow.target.as_str(),
            );
        }
        for end in self.graph.end_events() {
            builder.set_end_state(end.id.as_str(), end.id.as_str());
        }

        tracing::debug!(
            instance = %self.id,
            nodes = self.graph.node_count(),
            flows = self.graph.flow_count(),
            "State machine built"
        );
        Ok(builder.build())
    }

    /// Working copy of the machine, building it first if needed. Building
    /// locks the definition even if the caller's operation then fails.
    fn prepared_machine(&mut self) -> WorkflowResult<StateMachine> {
        if let Some(machine) = &self.machine {
            return Ok(machine.clone());
        }
        let machine = self.build_machine()?;
        self.machine = Some(machine.clone());
        Ok(machine)
    }

    fn live_machine(&self) -> WorkflowResult<&StateMachine> {
        self.machine
            .as_ref()
            .filter(|machine| machine.is_started())
            .ok_or(WorkflowError::NotStarted)
    }

    fn current_node_id(&self) -> Option<NodeId> {
        let machine = self.machine.as_ref()?;
        match machine.current_state()? {
            FINAL_STATE => machine
                .transition_log()
                .last()
                .map(|entry| NodeId::new(entry.from.as_str())),
            INITIAL_STATE => None,
            state => Some(NodeId::new(state)),
        }
    }

    fn state_node(&self, state: &str) -> Option<&FlowNode> {
        match state {
            INITIAL_STATE | FINAL_STATE => None,
            _ => self.graph.node(&NodeId::new(state)),
        }
    }

    /// Complete `node`'s item in `items` and resolve onwards, committing
    /// both the ledger and the machine only if everything succeeds
    fn complete_and_resolve(
        &mut self,
        mut items: WorkItemLedger,
        node: &FlowNode,
        participant: &Participant,
    ) -> WorkflowResult<()> {
        let current = self.current_node_id();
        items.complete(&self.graph, current.as_ref(), node, participant)?;

        let mut machine = self.live_machine()?.clone();
        self.resolver().resolve(
            &self.graph,
            &mut machine,
            &node.id,
            &self.process_data,
            self.evaluator.as_ref(),
        )?;

        self.work_items = items;
        self.machine = Some(machine);
        Ok(())
    }

    /// Act on the node that just became current: activities get a work
    /// item (and automated ones run under full advancement), end events
    /// end the instance
    fn advance(&mut self, mode: Advancement) -> WorkflowResult<()> {
        let mut runs = 0;
        loop {
            let node = match self.current_node() {
                Some(node) => node.clone(),
                None => return Ok(()),
            };

            if node.is_end() {
                return if self.is_ended() {
                    Ok(())
                } else {
                    self.end(&node)
                };
            }
            if !node.is_activity() {
                return Ok(());
            }

            self.work_items.create(&node.id);
            if mode == Advancement::Deferred || !node.is_operational() {
                return Ok(());
            }

            runs += 1;
            if runs > self.config.routing.max_hops {
                tracing::warn!(
                    instance = %self.id,
                    node = %node.id,
                    "Automated execution chain exceeded hop limit"
                );
                return Err(WorkflowError::RoutingLoop {
                    node: node.id,
                    limit: self.config.routing.max_hops,
                });
            }
            self.execute_operational(&node)?;
        }
    }

    fn execute_operational(&mut self, node: &FlowNode) -> WorkflowResult<()> {
        let runner = self
            .operation_runner
            .clone()
            .ok_or_else(|| WorkflowError::Operation {
                node: node.id.clone(),
                message: "no operation runner attached".into(),
            })?;

        let participant = runner
            .provide_participant(node, self)
            .map_err(|e| operation_error(node, e))?;
        let current = Some(&node.id);
        self.work_items
            .allocate(&self.graph, current, node, &participant)?;
        self.work_items
            .start(&self.graph, current, node, &participant)?;

        tracing::debug!(
            instance = %self.id,
            node = %node.id,
            participant = %participant.id,
            "Running automated task"
        );
        if let Err(e) = runner.run(node, &mut self.process_data) {
            let error = operation_error(node, e);
            tracing::warn!(
                instance = %self.id,
                node = %node.id,
                error = %error,
                "Automated task failed"
            );
            return Err(error);
        }

        let items = self.work_items.clone();
        self.complete_and_resolve(items, node, &participant)
    }

    fn end(&mut self, node: &FlowNode) -> WorkflowResult<()> {
        let mut machine = self.live_machine()?.clone();
        machine.trigger(node.id.as_str())?;
        self.machine = Some(machine);
        self.ended_at = Some(Utc::now());
        tracing::info!(
            instance = %self.id,
            end = %node.id,
            transitions = self.transition_log().len(),
            "Workflow instance ended"
        );
        Ok(())
    }
}
