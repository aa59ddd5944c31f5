//! State machine: a generic finite-state runtime with a transition log
//!
//! States and triggers are plain strings; the machine knows nothing about
//! flow nodes. Every successful [`StateMachine::trigger`] appends exactly
//! one [`TransitionLogEntry`], and nothing else ever touches the log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use workflow_model::{WorkflowError, WorkflowResult};

/// Synthetic state active right after [`StateMachine::start`]
pub const INITIAL_STATE: &str = "__START__";

/// Synthetic sink entered when a terminal state is left
pub const FINAL_STATE: &str = "__END__";

/// Role of a state within the machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateKind {
    Initial,
    Normal,
    Final,
}

/// One committed transition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionLogEntry {
    /// Strictly increasing, starting at 1
    pub sequence: u64,
    pub from: String,
    pub to: String,
    pub trigger: String,
    pub at: DateTime<Utc>,
}

/// Collects states and transitions before the machine is built
#[derive(Clone, Debug)]
pub struct StateMachineBuilder {
    id: String,
    states: BTreeMap<String, StateKind>,
    transitions: BTreeMap<String, BTreeMap<String, String>>,
}

impl StateMachineBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        let mut states = BTreeMap::new();
        states.insert(INITIAL_STATE.to_string(), StateKind::Initial);
        Self {
            id: id.into(),
            states,
            transitions: BTreeMap::new(),
        }
    }

    pub fn add_state(&mut self, state: impl Into<String>) -> &mut Self {
        self.states
            .entry(state.into())
            .or_insert(StateKind::Normal);
        self
    }

    /// Register `from --trigger--> to`; a later registration for the same
    /// pair replaces the earlier one
    pub fn add_transition(
        &mut self,
        from: impl Into<String>,
        trigger: impl Into<String>,
        to: impl Into<String>,
    ) -> &mut Self {
        let from = from.into();
        let to = to.into();
        self.add_state(from.clone());
        self.add_state(to.clone());
        self.transitions
            .entry(from)
            .or_default()
            .insert(trigger.into(), to);
        self
    }

    /// Make `state` terminal: `trigger` moves it into [`FINAL_STATE`]
    pub fn set_end_state(
        &mut self,
        state: impl Into<String>,
        trigger: impl Into<String>,
    ) -> &mut Self {
        self.states
            .insert(FINAL_STATE.to_string(), StateKind::Final);
        let state = state.into();
        self.add_state(state.clone());
        self.transitions
            .entry(state)
            .or_default()
            .insert(trigger.into(), FINAL_STATE.to_string());
        self
    }

    pub fn build(&self) -> StateMachine {
        StateMachine {
            id: self.id.clone(),
            states: self.states.clone(),
            transitions: self.transitions.clone(),
            started: false,
            current: None,
            previous: None,
            log: Vec::new(),
        }
    }
}

/// A finite state machine with current/previous pointers and a log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateMachine {
    id: String,
    states: BTreeMap<String, StateKind>,
    transitions: BTreeMap<String, BTreeMap<String, String>>,
    started: bool,
    current: Option<String>,
    previous: Option<String>,
    log: Vec<TransitionLogEntry>,
}

impl StateMachine {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Activate the initial state
    pub fn start(&mut self) -> WorkflowResult<()> {
        if self.started {
            return Err(WorkflowError::AlreadyStarted);
        }
        self.started = true;
        self.current = Some(INITIAL_STATE.to_string());
        tracing::trace!(machine = %self.id, "State machine started");
        Ok(())
    }

    /// Follow the transition registered for (current state, trigger)
    pub fn trigger(&mut self, trigger: &str) -> WorkflowResult<()> {
        let from = self.current.clone().ok_or(WorkflowError::NotStarted)?;
        let to = self
            .transitions
            .get(&from)
            .and_then(|t| t.get(trigger))
            .cloned()
            .ok_or_else(|| WorkflowError::NoSuchTransition {
                from: from.clone(),
                trigger: trigger.to_string(),
            })?;

        let sequence = self.log.last().map(|e| e.sequence + 1).unwrap_or(1);
        tracing::trace!(
            machine = %self.id,
            sequence,
            from = %from,
            to = %to,
            trigger,
            "Transition"
        );
        self.log.push(TransitionLogEntry {
            sequence,
            from: from.clone(),
            to: to.clone(),
            trigger: trigger.to_string(),
            at: Utc::now(),
        });
        self.previous = Some(from);
        self.current = Some(to);
        Ok(())
    }

    /// Override the current state without consulting transitions.
    /// Nothing is appended to the transition log.
    pub fn jump_to(&mut self, state: &str) -> WorkflowResult<()> {
        match self.states.get(state) {
            None | Some(StateKind::Initial) => {
                return Err(WorkflowError::UnknownState(state.to_string()))
            }
            Some(_) => {}
        }
        self.started = true;
        self.previous = self.current.take();
        self.current = Some(state.to_string());
        tracing::trace!(machine = %self.id, to = state, "Jumped");
        Ok(())
    }

    pub fn current_state(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// The state before the most recent trigger. Once the machine has
    /// ended this is the source of the second-to-last log entry, since
    /// the last entry only records leaving the terminal state.
    pub fn previous_state(&self) -> Option<&str> {
        if self.is_ended() && self.log.len() >= 2 {
            return Some(self.log[self.log.len() - 2].from.as_str());
        }
        self.previous.as_deref()
    }

    pub fn transition_log(&self) -> &[TransitionLogEntry] {
        &self.log
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_active(&self) -> bool {
        self.started && !self.is_ended()
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.current_kind(), Some(StateKind::Final))
    }

    pub fn state_kind(&self, state: &str) -> Option<StateKind> {
        self.states.get(state).copied()
    }

    fn current_kind(&self) -> Option<StateKind> {
        self.current.as_deref().and_then(|s| self.state_kind(s))
    }
}
