//! Workflow runtime: drives one process instance from start event to end
//!
//! # Architecture
//!
//! ```text
//!   WorkflowInstance (façade)
//!     ├── StateMachine         ─ where the instance is, and the transition log
//!     ├── SequenceFlowResolver ─ which flow to take; hops through routers
//!     │     └── ConditionEvaluator (pluggable)
//!     ├── WorkItemLedger       ─ allocate / start / complete with role checks
//!     │     └── OperationRunner (pluggable, automated tasks)
//!     └── activity_log         ─ activity visits projected from the log
//! ```
//!
//! A [`WorkflowInstance`] is populated with nodes, flows and roles, then
//! started at a start event. From there the resolver picks flows (first
//! unconditional or true conditional flow in declaration order, else the
//! node's default flow), human tasks wait for [`WorkflowInstance::complete_task`]
//! and automated tasks are run through the attached [`OperationRunner`].
//!
//! Every public operation takes `&mut self`; an instance is driven by one
//! caller at a time. Instances can share one definition through
//! [`WorkflowInstance::from_graph`].

#![deny(unsafe_code)]

mod activity_log;
mod condition;
mod config;
mod instance;
mod operation;
mod options;
mod resolver;
mod snapshot;
mod state_machine;
mod work_items;

pub use activity_log::{project as project_activity_log, ActivityLogEntry};
pub use condition::*;
pub use config::*;
pub use instance::*;
pub use operation::OperationRunner;
pub use options::*;
pub use resolver::*;
pub use snapshot::*;
pub use state_machine::*;
pub use work_items::*;

pub use workflow_model::*;
