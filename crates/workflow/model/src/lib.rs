//! Process graph model for the workflow engine
//!
//! A process definition is a directed graph of **flow nodes** joined by
//! **connecting flows**. Nodes carry a closed set of kinds (events, tasks,
//! routers) whose capabilities drive the runtime; flows may carry a
//! condition that is evaluated against process data.
//!
//! # Key Concepts
//!
//! - **ProcessGraph**: nodes, flows and roles with lookup by identifier and
//!   by source node. Pure storage, no execution logic.
//! - **FlowNode**: a vertex with a [`NodeKind`] and an optional role and
//!   default flow.
//! - **ConnectingFlow**: a directed, optionally conditional edge. Declaration
//!   order is the tie-break when several flows leave one node.
//! - **Role / Participant**: authorization for work on activity nodes.
//! - **WorkItem**: the runtime record of one activity being performed.
//! - **ProcessData**: the key/value context conditions are evaluated against.

#![deny(unsafe_code)]

mod errors;
mod flow;
mod graph;
mod node;
mod participant;
mod process_data;
mod work_item;

pub use errors::*;
pub use flow::*;
pub use graph::*;
pub use node::*;
pub use participant::*;
pub use process_data::*;
pub use work_item::*;
