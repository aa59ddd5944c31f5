//! Work items: the runtime record of an activity being performed
//!
//! A work item moves strictly forward through
//! `Created → Allocated → Started → Completed`. Authorization and the
//! "node must be current" rule are enforced by the runtime before any of
//! these transitions is attempted.

use crate::{NodeId, ParticipantId, WorkflowError, WorkflowResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a work item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkItemState {
    Created,
    Allocated,
    Started,
    Completed,
}

impl std::fmt::Display for WorkItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Created => "created",
            Self::Allocated => "allocated",
            Self::Started => "started",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// One traversal of an activity node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub node_id: NodeId,
    pub state: WorkItemState,
    /// Participant the item was allocated to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant: Option<ParticipantId>,
    /// Participant that completed the item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<ParticipantId>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkItem {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            state: WorkItemState::Created,
            participant: None,
            completed_by: None,
            created_at: Utc::now(),
            allocated_at: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn allocate(&mut self, participant: ParticipantId) -> WorkflowResult<()> {
        self.require_state(WorkItemState::Created, "allocate")?;
        self.state = WorkItemState::Allocated;
        self.participant = Some(participant);
        self.allocated_at = Some(Utc::now());
        Ok(())
    }

    pub fn start(&mut self) -> WorkflowResult<()> {
        self.require_state(WorkItemState::Allocated, "start")?;
        self.state = WorkItemState::Started;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn complete(&mut self, participant: ParticipantId) -> WorkflowResult<()> {
        self.require_state(WorkItemState::Started, "complete")?;
        self.state = WorkItemState::Completed;
        self.completed_by = Some(participant);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.state == WorkItemState::Completed
    }

    fn require_state(&self, required: WorkItemState, action: &'static str) -> WorkflowResult<()> {
        if self.state == required {
            Ok(())
        } else {
            Err(WorkflowError::InvalidWorkItemTransition {
                node: self.node_id.clone(),
                state: self.state,
                action,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_lifecycle() {
        let mut item = WorkItem::new(NodeId::new("review"));
        assert_eq!(item.state, WorkItemState::Created);

        item.allocate(ParticipantId::new("alice")).unwrap();
        assert_eq!(item.state, WorkItemState::Allocated);
        assert_eq!(item.participant, Some(ParticipantId::new("alice")));
        assert!(item.allocated_at.is_some());

        item.start().unwrap();
        assert_eq!(item.state, WorkItemState::Started);

        item.complete(ParticipantId::new("alice")).unwrap();
        assert!(item.is_completed());
        assert!(item.completed_at.is_some());
    }

    #[test]
    fn test_cannot_skip_states() {
        let mut item = WorkItem::new(NodeId::new("review"));
        let result = item.start();
        assert!(matches!(
            result,
            Err(WorkflowError::InvalidWorkItemTransition {
                state: WorkItemState::Created,
                action: "start",
                ..
            })
        ));

        let result = item.complete(ParticipantId::new("alice"));
        assert!(result.is_err());
        assert_eq!(item.state, WorkItemState::Created);
    }

    #[test]
    fn test_no_rollback_after_completion() {
        let mut item = WorkItem::new(NodeId::new("review"));
        item.allocate(ParticipantId::new("alice")).unwrap();
        item.start().unwrap();
        item.complete(ParticipantId::new("alice")).unwrap();

        assert!(item.allocate(ParticipantId::new("bob")).is_err());
        assert!(item.start().is_err());
        assert_eq!(item.participant, Some(ParticipantId::new("alice")));
    }
}
