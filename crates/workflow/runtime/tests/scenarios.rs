//! End-to-end scenarios driving a `WorkflowInstance` through whole processes

use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use workflow_runtime::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn node(id: &str) -> NodeId {
    NodeId::new(id)
}

fn flow(id: &str, source: &str, target: &str) -> ConnectingFlow {
    ConnectingFlow::new(id, node(source), node(target))
}

fn participant(id: &str, role: &str) -> Participant {
    Participant::new(id).with_role(RoleId::new(role))
}

// ── Start → Task A → End ─────────────────────────────────────────────

fn three_node() -> WorkflowInstance {
    let mut instance = WorkflowInstance::new("three-node");
    instance.add_role(Role::new("worker").with_name("Worker")).unwrap();
    instance.add_node(FlowNode::start_event("start")).unwrap();
    instance
        .add_node(FlowNode::human_task("task_a", "Task A").with_role(RoleId::new("worker")))
        .unwrap();
    instance.add_node(FlowNode::end_event("end")).unwrap();
    instance.add_edge(flow("f1", "start", "task_a")).unwrap();
    instance.add_edge(flow("f2", "task_a", "end")).unwrap();
    instance
}

#[test]
fn three_node_process_runs_to_end() {
    init_tracing();
    let mut instance = three_node();

    instance.start(&node("start")).unwrap();
    assert_eq!(instance.current_node().unwrap().id, node("task_a"));

    instance
        .complete_task(&participant("alice", "worker"))
        .unwrap();
    assert!(instance.is_ended());
    assert!(instance.ended_at().unwrap() >= instance.started_at().unwrap());

    let log = instance.activity_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].node_id, node("task_a"));
    assert_eq!(log[0].name, "Task A");
    let item = log[0].work_item.as_ref().unwrap();
    assert_eq!(item.state, WorkItemState::Completed);
}

#[test]
fn unauthorized_completion_changes_nothing() {
    init_tracing();
    let mut instance = three_node();
    instance.start(&node("start")).unwrap();
    let log_len = instance.transition_log().len();

    let result = instance.complete_task(&participant("mallory", "auditor"));
    assert!(matches!(
        result,
        Err(WorkflowError::AccessDenied { ref role, .. }) if role == &RoleId::new("worker")
    ));
    assert_eq!(instance.current_node().unwrap().id, node("task_a"));
    assert_eq!(instance.transition_log().len(), log_len);
    assert!(instance.is_active());
}

#[test]
fn transition_log_is_ordered_and_chained() {
    let mut instance = three_node();
    instance.start(&node("start")).unwrap();
    instance
        .complete_task(&participant("alice", "worker"))
        .unwrap();

    let log = instance.transition_log();
    assert_eq!(log.first().unwrap().from, INITIAL_STATE);
    assert_eq!(log.last().unwrap().to, FINAL_STATE);
    for pair in log.windows(2) {
        assert!(pair[0].sequence < pair[1].sequence);
        assert_eq!(pair[0].to, pair[1].from);
    }
}

// ── Exclusive routing with a default flow ────────────────────────────

fn approval() -> WorkflowInstance {
    let mut instance = WorkflowInstance::new("approval");
    instance.add_node(FlowNode::start_event("start")).unwrap();
    instance
        .add_node(FlowNode::exclusive_router("check").with_default_flow(FlowId::new("to_b")))
        .unwrap();
    instance.add_node(FlowNode::human_task("path_a", "Path A")).unwrap();
    instance.add_node(FlowNode::human_task("path_b", "Path B")).unwrap();
    instance.add_node(FlowNode::end_event("end")).unwrap();
    instance.add_edge(flow("f0", "start", "check")).unwrap();
    instance
        .add_edge(ConnectingFlow::conditional(
            "to_a",
            node("check"),
            node("path_a"),
            "amount > 100",
        ))
        .unwrap();
    instance.add_edge(flow("to_b", "check", "path_b")).unwrap();
    instance.add_edge(flow("a_end", "path_a", "end")).unwrap();
    instance.add_edge(flow("b_end", "path_b", "end")).unwrap();
    instance
}

#[test]
fn small_amount_takes_default_path() {
    init_tracing();
    let mut instance = approval();
    instance.set_process_data(ProcessData::new().with("amount", 50));
    instance.start(&node("start")).unwrap();

    assert_eq!(instance.current_node().unwrap().id, node("path_b"));
    assert_eq!(instance.previous_node().unwrap().id, node("check"));
}

#[test]
fn large_amount_takes_conditional_path() {
    let mut instance = approval();
    instance.set_process_data(ProcessData::new().with("amount", 500));
    instance.start(&node("start")).unwrap();
    assert_eq!(instance.current_node().unwrap().id, node("path_a"));
}

#[test]
fn missing_data_fails_cleanly_and_can_be_retried() {
    let mut instance = approval();

    let result = instance.start(&node("start"));
    assert!(matches!(result, Err(WorkflowError::Expression { .. })));
    assert!(!instance.is_active());
    assert!(instance.transition_log().is_empty());

    instance.process_data_mut().insert("amount", 150);
    instance.start(&node("start")).unwrap();
    assert_eq!(instance.current_node().unwrap().id, node("path_a"));
}

#[test]
fn failed_completion_leaves_task_open_for_retry() {
    init_tracing();
    let mut instance = WorkflowInstance::new("review-then-route");
    instance.add_node(FlowNode::start_event("start")).unwrap();
    instance.add_node(FlowNode::human_task("review", "Review")).unwrap();
    instance
        .add_node(FlowNode::exclusive_router("check").with_default_flow(FlowId::new("to_b")))
        .unwrap();
    instance.add_node(FlowNode::human_task("path_a", "Path A")).unwrap();
    instance.add_node(FlowNode::human_task("path_b", "Path B")).unwrap();
    instance.add_node(FlowNode::end_event("end")).unwrap();
    instance.add_edge(flow("f0", "start", "review")).unwrap();
    instance.add_edge(flow("f1", "review", "check")).unwrap();
    instance
        .add_edge(ConnectingFlow::conditional(
            "to_a",
            node("check"),
            node("path_a"),
            "amount > 100",
        ))
        .unwrap();
    instance.add_edge(flow("to_b", "check", "path_b")).unwrap();
    instance.add_edge(flow("a_end", "path_a", "end")).unwrap();
    instance.add_edge(flow("b_end", "path_b", "end")).unwrap();

    let reviewer = Participant::new("rita").with_role(RoleId::default_role());
    instance.start(&node("start")).unwrap();
    instance.allocate_work_item(&node("review"), &reviewer).unwrap();
    instance.start_work_item(&node("review"), &reviewer).unwrap();
    let log_len = instance.transition_log().len();

    let result = instance.complete_task(&reviewer);
    assert!(matches!(result, Err(WorkflowError::Expression { .. })));
    assert_eq!(instance.current_node().unwrap().id, node("review"));
    assert_eq!(instance.transition_log().len(), log_len);
    assert_eq!(
        instance.work_item(&node("review")).unwrap().state,
        WorkItemState::Started
    );
    assert!(instance.work_item(&node("path_a")).is_none());

    instance.process_data_mut().insert("amount", 150);
    instance.complete_task(&reviewer).unwrap();
    assert_eq!(instance.current_node().unwrap().id, node("path_a"));
    assert_eq!(
        instance.work_item(&node("review")).unwrap().state,
        WorkItemState::Completed
    );
    assert!(instance.transition_log().len() > log_len);
}

#[test]
fn activity_log_excludes_routers_and_events() {
    let mut instance = approval();
    instance.set_process_data(ProcessData::new().with("amount", 50));
    instance.start(&node("start")).unwrap();
    instance
        .complete_task(&Participant::new("anyone").with_role(RoleId::default_role()))
        .unwrap();

    let visited: Vec<NodeId> = instance
        .activity_log()
        .into_iter()
        .map(|entry| entry.node_id)
        .collect();
    assert_eq!(visited, vec![node("path_b")]);
}

#[test]
fn custom_condition_evaluator_is_used() {
    struct AlwaysFalse;
    impl ConditionEvaluator for AlwaysFalse {
        fn evaluate(&self, _expression: &str, _data: &ProcessData) -> WorkflowResult<bool> {
            Ok(false)
        }
    }

    let mut instance = approval();
    instance.set_condition_evaluator(Arc::new(AlwaysFalse));
    instance.start(&node("start")).unwrap();
    assert_eq!(instance.current_node().unwrap().id, node("path_b"));
}

// ── Automated tasks ──────────────────────────────────────────────────

struct Recorder {
    fail_on: Option<String>,
    ran: Mutex<Vec<String>>,
}

impl Recorder {
    fn new() -> Self {
        Self {
            fail_on: None,
            ran: Mutex::new(Vec::new()),
        }
    }

    fn failing_on(node: &str) -> Self {
        Self {
            fail_on: Some(node.to_string()),
            ran: Mutex::new(Vec::new()),
        }
    }
}

impl OperationRunner for Recorder {
    fn provide_participant(
        &self,
        _node: &FlowNode,
        instance: &WorkflowInstance,
    ) -> WorkflowResult<Participant> {
        assert!(instance.is_active());
        Ok(participant("robot", "system"))
    }

    fn run(&self, node: &FlowNode, data: &mut ProcessData) -> WorkflowResult<()> {
        self.ran.lock().unwrap().push(node.id.to_string());
        if self.fail_on.as_deref() == Some(node.id.as_str()) {
            return Err(WorkflowError::Operation {
                node: node.id.clone(),
                message: "gateway timeout".into(),
            });
        }
        data.insert("score", 120);
        Ok(())
    }
}

/// start → score (automated) → route → [score > 100] fast / default manual → end
fn scoring() -> WorkflowInstance {
    let mut instance = WorkflowInstance::new("scoring");
    instance.add_node(FlowNode::start_event("start")).unwrap();
    instance
        .add_node(FlowNode::automated_task("score", "Score").with_role(RoleId::new("system")))
        .unwrap();
    instance
        .add_node(FlowNode::exclusive_router("route").with_default_flow(FlowId::new("to_manual")))
        .unwrap();
    instance
        .add_node(FlowNode::human_task("fast", "Fast track").with_role(RoleId::new("clerk")))
        .unwrap();
    instance
        .add_node(FlowNode::human_task("manual", "Manual review").with_role(RoleId::new("clerk")))
        .unwrap();
    instance.add_node(FlowNode::end_event("end")).unwrap();
    instance.add_edge(flow("f1", "start", "score")).unwrap();
    instance.add_edge(flow("f2", "score", "route")).unwrap();
    instance
        .add_edge(ConnectingFlow::conditional(
            "to_fast",
            node("route"),
            node("fast"),
            "score > 100",
        ))
        .unwrap();
    instance.add_edge(flow("to_manual", "route", "manual")).unwrap();
    instance.add_edge(flow("fast_end", "fast", "end")).unwrap();
    instance.add_edge(flow("manual_end", "manual", "end")).unwrap();
    instance
}

#[test]
fn automated_task_runs_and_routes_on_its_output() {
    init_tracing();
    let runner = Arc::new(Recorder::new());
    let mut instance = scoring();
    instance.set_operation_runner(runner.clone());
    instance.start(&node("start")).unwrap();

    assert_eq!(*runner.ran.lock().unwrap(), vec!["score".to_string()]);
    assert_eq!(instance.current_node().unwrap().id, node("fast"));
    let item = instance.work_item(&node("score")).unwrap();
    assert_eq!(item.state, WorkItemState::Completed);
    assert_eq!(item.completed_by, Some(ParticipantId::new("robot")));

    instance.complete_task(&participant("carol", "clerk")).unwrap();
    let names: Vec<String> = instance
        .activity_log()
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(names, vec!["Score", "Fast track"]);
}

#[test]
fn failing_automated_task_stays_started() {
    let runner = Arc::new(Recorder::failing_on("score"));
    let mut instance = scoring();
    instance.set_operation_runner(runner);

    let result = instance.start(&node("start"));
    assert!(matches!(
        result,
        Err(WorkflowError::Operation { ref message, .. }) if message == "gateway timeout"
    ));
    assert!(instance.is_active());
    assert_eq!(instance.current_node().unwrap().id, node("score"));
    assert_eq!(
        instance.work_item(&node("score")).unwrap().state,
        WorkItemState::Started
    );
}

#[test]
fn deferred_automation_can_be_completed_by_hand() {
    let mut instance = scoring();
    let summary = instance.start_flow_to(&node("start")).unwrap();
    assert_eq!(summary.current.as_deref(), Some("Score"));

    let robot = participant("robot", "system");
    instance.allocate_work_item(&node("score"), &robot).unwrap();
    instance.start_work_item(&node("score"), &robot).unwrap();
    instance.process_data_mut().insert("score", 10);
    instance.complete_work_item(&node("score"), &robot).unwrap();

    assert_eq!(instance.current_node().unwrap().id, node("manual"));
}

// ── Manual navigation ────────────────────────────────────────────────

#[test]
fn manual_navigation_by_option_name() {
    let mut instance = approval();
    instance.set_process_data(ProcessData::new().with("amount", 50));
    instance.start(&node("start")).unwrap();
    instance.jump_to(&node("check")).unwrap();

    assert_eq!(instance.next_option_names(), vec!["to_a", "to_b"]);
    let option = instance.option_by_name("Path A").unwrap();
    let flow_id = FlowId::new(option.id());

    let outcome = instance.flow_to(Some(&flow_id), true).unwrap();
    assert_eq!(outcome, FlowOutcome::Advanced);
    assert_eq!(instance.current_node().unwrap().id, node("path_a"));
    assert!(instance.work_item(&node("path_a")).is_some());
}

// ── Routing safety ───────────────────────────────────────────────────

#[test]
fn routing_cycle_is_reported() {
    let mut instance = WorkflowInstance::new("cycle")
        .with_config(EngineConfig::default().with_max_routing_hops(4));
    instance.add_node(FlowNode::start_event("start")).unwrap();
    instance.add_node(FlowNode::exclusive_router("g1")).unwrap();
    instance.add_node(FlowNode::parallel_router("g2")).unwrap();
    instance.add_node(FlowNode::end_event("end")).unwrap();
    instance.add_edge(flow("f1", "start", "g1")).unwrap();
    instance.add_edge(flow("f2", "g1", "g2")).unwrap();
    instance.add_edge(flow("f3", "g2", "g1")).unwrap();

    assert!(matches!(
        instance.graph().validate(),
        Err(WorkflowError::RoutingCycle(_))
    ));
    let result = instance.start(&node("start"));
    assert!(matches!(result, Err(WorkflowError::RoutingLoop { limit: 4, .. })));
    assert!(instance.transition_log().is_empty());
}

#[test]
fn config_loaded_from_json_drives_the_instance() {
    let config = EngineConfig::from_json(r#"{"validate_on_start": true}"#).unwrap();
    let mut instance = WorkflowInstance::new("validated").with_config(config);
    instance.add_node(FlowNode::end_event("end")).unwrap();
    assert!(matches!(
        instance.start(&node("start")),
        Err(WorkflowError::NoStartEvent)
    ));
}

// ── Snapshots ────────────────────────────────────────────────────────

#[test]
fn snapshot_round_trip_continues_identically() {
    init_tracing();
    let runner = Arc::new(Recorder::new());
    let mut original = scoring();
    original.set_operation_runner(runner.clone());
    original.start(&node("start")).unwrap();

    let json = original.snapshot().to_json().unwrap();
    let mut restored = WorkflowInstance::restore(InstanceSnapshot::from_json(&json).unwrap()).unwrap();
    restored.set_operation_runner(runner);

    let clerk = participant("carol", "clerk");
    original.complete_task(&clerk).unwrap();
    restored.complete_task(&clerk).unwrap();

    let strip = |instance: &WorkflowInstance| -> Vec<(u64, String, String, String)> {
        instance
            .transition_log()
            .iter()
            .map(|e| (e.sequence, e.from.clone(), e.to.clone(), e.trigger.clone()))
            .collect()
    };
    assert_eq!(strip(&restored), strip(&original));
    assert_eq!(restored.is_ended(), original.is_ended());
    assert_eq!(restored.process_data(), original.process_data());
    assert_eq!(restored.work_items().len(), original.work_items().len());
    assert_eq!(restored.activity_log().len(), original.activity_log().len());
}

// ── Properties ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn completion_denied_for_every_foreign_role(
        required in "[a-z]{1,8}",
        held in prop::collection::vec("[a-z]{1,8}", 0..4),
    ) {
        prop_assume!(!held.contains(&required));

        let mut instance = WorkflowInstance::new("prop");
        instance.add_node(FlowNode::start_event("s")).unwrap();
        instance
            .add_node(FlowNode::human_task("t", "Task").with_role(RoleId::new(required.clone())))
            .unwrap();
        instance.add_node(FlowNode::end_event("e")).unwrap();
        instance.add_edge(flow("f1", "s", "t")).unwrap();
        instance.add_edge(flow("f2", "t", "e")).unwrap();
        instance.start(&node("s")).unwrap();

        let mut who = Participant::new("p");
        for role in &held {
            who = who.with_role(RoleId::new(role.clone()));
        }
        let before = instance.transition_log().len();
        let denied = matches!(
            instance.complete_task(&who),
            Err(WorkflowError::AccessDenied { .. })
        );
        prop_assert!(denied);
        prop_assert_eq!(instance.transition_log().len(), before);
        prop_assert_eq!(&instance.current_node().unwrap().id, &node("t"));
    }

    #[test]
    fn default_flow_wins_wherever_it_is_declared(
        conditional in 1usize..6,
        default_at in 0usize..6,
        amount in 0i64..100,
    ) {
        let default_at = default_at % (conditional + 1);
        let mut instance = WorkflowInstance::new("fallback");
        instance.add_node(FlowNode::start_event("s")).unwrap();
        instance
            .add_node(FlowNode::exclusive_router("gw").with_default_flow(FlowId::new("default")))
            .unwrap();
        instance.add_node(FlowNode::end_event("fallback")).unwrap();
        instance.add_edge(flow("f0", "s", "gw")).unwrap();
        for i in 0..=conditional {
            if i == default_at {
                instance.add_edge(flow("default", "gw", "fallback")).unwrap();
            }
            if i < conditional {
                let target = format!("t{}", i);
                instance.add_node(FlowNode::end_event(target.as_str())).unwrap();
                instance
                    .add_edge(ConnectingFlow::conditional(
                        format!("c{}", i),
                        node("gw"),
                        node(&target),
                        format!("amount > {}", 100 + i),
                    ))
                    .unwrap();
            }
        }
        instance.set_process_data(ProcessData::new().with("amount", amount));
        instance.start(&node("s")).unwrap();

        prop_assert!(instance.is_ended());
        prop_assert_eq!(&instance.current_node().unwrap().id, &node("fallback"));
    }
}
