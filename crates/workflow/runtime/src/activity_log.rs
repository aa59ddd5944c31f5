//! Activity log: which activities were visited, in order
//!
//! A projection over the transition log. Entries whose target is an
//! activity node become records; events and routers are left out. The n-th
//! visit to a node is paired with the n-th work item created for it.

use crate::{TransitionLogEntry, WorkItemLedger};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use workflow_model::{NodeId, ProcessGraph, WorkItem};

/// One visit to an activity node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    /// 1-based position among activity visits
    pub position: usize,
    /// Sequence number of the transition that entered the node
    pub sequence: u64,
    pub node_id: NodeId,
    pub name: String,
    pub entered_at: DateTime<Utc>,
    /// The work item of this visit, if one was created
    pub work_item: Option<WorkItem>,
}

/// Derive the activity log from recorded history
pub fn project(
    graph: &ProcessGraph,
    log: &[TransitionLogEntry],
    work_items: &WorkItemLedger,
) -> Vec<ActivityLogEntry> {
    let mut visits: HashMap<&str, usize> = HashMap::new();
    let mut entries = Vec::new();

    for transition in log {
        let node = match graph.node(&NodeId::new(transition.to.as_str())) {
            Some(node) if node.is_activity() => node,
            _ => continue,
        };
        let visit = visits.entry(transition.to.as_str()).or_insert(0);
        let work_item = work_items.for_node(&node.id).nth(*visit).cloned();
        *visit += 1;

        entries.push(ActivityLogEntry {
            position: entries.len() + 1,
            sequence: transition.sequence,
            node_id: node.id.clone(),
            name: node.label().to_string(),
            entered_at: transition.at,
            work_item,
        });
    }
    entries
}
