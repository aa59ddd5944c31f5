//! Instance snapshots for save/restore
//!
//! A snapshot captures everything needed to continue an instance later:
//! its definition (roles included), the full state machine with its
//! transition log, process data, work items and timestamps. The condition
//! evaluator and operation runner are never captured; a restored instance
//! starts with the built-in evaluator and no runner, and callers re-attach
//! their own before driving it further.

use crate::{
    EngineConfig, ExpressionEvaluator, StateMachine, WorkItemLedger, WorkflowInstance,
    WorkflowInstanceId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use workflow_model::{ProcessData, ProcessGraph, WorkflowError, WorkflowResult};

/// Format version written by this build
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable state of a [`WorkflowInstance`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub version: u32,
    pub id: WorkflowInstanceId,
    pub name: String,
    /// Nodes, flows and roles
    pub graph: ProcessGraph,
    /// Absent until the instance first built its state machine
    pub state_machine: Option<StateMachine>,
    pub process_data: ProcessData,
    pub work_items: WorkItemLedger,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub config: EngineConfig,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
}

impl InstanceSnapshot {
    pub fn to_json(&self) -> WorkflowResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a snapshot, rejecting versions this build cannot read
    pub fn from_json(json: &str) -> WorkflowResult<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    fn check_version(&self) -> WorkflowResult<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(WorkflowError::Snapshot(format!(
                "unsupported snapshot version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        Ok(())
    }
}

impl WorkflowInstance {
    /// Capture the current state
    pub fn snapshot(&self) -> InstanceSnapshot {
        InstanceSnapshot {
            version: SNAPSHOT_VERSION,
            id: self.id.clone(),
            name: self.name.clone(),
            graph: self.graph.as_ref().clone(),
            state_machine: self.machine.clone(),
            process_data: self.process_data.clone(),
            work_items: self.work_items.clone(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            config: self.config.clone(),
            taken_at: Utc::now(),
        }
    }

    /// Rebuild an instance from a snapshot. Collaborators must be
    /// re-attached by the caller.
    pub fn restore(snapshot: InstanceSnapshot) -> WorkflowResult<Self> {
        snapshot.check_version()?;
        tracing::debug!(
            instance = %snapshot.id,
            transitions = snapshot
                .state_machine
                .as_ref()
                .map_or(0, |machine| machine.transition_log().len()),
            "Restoring workflow instance"
        );

        Ok(Self {
            id: snapshot.id,
            name: snapshot.name,
            graph: Arc::new(snapshot.graph),
            machine: snapshot.state_machine,
            process_data: snapshot.process_data,
            work_items: snapshot.work_items,
            started_at: snapshot.started_at,
            ended_at: snapshot.ended_at,
            config: snapshot.config,
            evaluator: Arc::new(ExpressionEvaluator::new()),
            operation_runner: None,
        })
    }
}
