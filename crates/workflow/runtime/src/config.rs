//! Configuration for the workflow runtime

use serde::{Deserialize, Serialize};
use workflow_model::WorkflowResult;

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub routing: RoutingConfig,
    /// Run [`workflow_model::ProcessGraph::validate`] before the state
    /// machine is built
    pub validate_on_start: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            routing: RoutingConfig::default(),
            validate_on_start: false,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration document; missing fields take their defaults
    pub fn from_json(json: &str) -> WorkflowResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_max_routing_hops(mut self, max_hops: usize) -> Self {
        self.routing.max_hops = max_hops;
        self
    }

    pub fn with_validation(mut self) -> Self {
        self.validate_on_start = true;
        self
    }
}

/// Automatic traversal through routing nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Upper bound on consecutive automatic hops during one resolution
    pub max_hops: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self { max_hops: 64 }
    }
}
