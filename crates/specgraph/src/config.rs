//! Engine configuration.
//!
//! The only tunables are the traversal budgets each operation passes to the
//! store. They are plain configuration values handed in per call; nothing
//! here is global.
//!
//! ```yaml
//! traversal:
//!   artifact_hierarchy: { max_depth: 3, max_nodes: 500, max_edges: 1000 }
//!   completion_cascade: { max_depth: 2, max_nodes: 200, max_edges: 500 }
//! ```
//!
//! Keys that are left out keep their defaults.

use crate::domain::{ObjectId, RelType};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use specgraph_store::{Direction, ExpandRequest};
use std::path::Path;
use tokio::fs;

/// Hard caps for one bounded traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalBudget {
    /// Maximum hops from the root
    pub max_depth: usize,
    /// Maximum nodes returned
    pub max_nodes: usize,
    /// Maximum edges returned
    pub max_edges: usize,
}

impl TraversalBudget {
    /// Create a budget.
    pub const fn new(max_depth: usize, max_nodes: usize, max_edges: usize) -> Self {
        Self {
            max_depth,
            max_nodes,
            max_edges,
        }
    }

    /// Build an expand request from a single root.
    pub fn request(
        &self,
        root: &ObjectId,
        direction: Direction,
        relationships: &[RelType],
    ) -> ExpandRequest {
        ExpandRequest {
            root_ids: vec![root.clone()],
            direction,
            max_depth: self.max_depth,
            max_nodes: self.max_nodes,
            max_edges: self.max_edges,
            relationship_types: RelType::names(relationships),
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.max_depth == 0 || self.max_nodes == 0 || self.max_edges == 0 {
            return Err(Error::Config(format!(
                "traversal.{name}: max_depth, max_nodes and max_edges must be positive"
            )));
        }
        Ok(())
    }
}

/// Budgets for every traversal the engine issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Change -> proposal/spec/design, spec -> requirement -> scenario.
    /// Needs depth 3 to reach scenarios.
    pub artifact_hierarchy: TraversalBudget,
    /// Change -> tasks, for task counts.
    pub task_counts: TraversalBudget,
    /// Change -> tasks -> blockers and assignees.
    pub task_graph: TraversalBudget,
    /// Both directions around a completed task.
    pub completion_cascade: TraversalBudget,
    /// Requirements and scenarios under an artifact being marked ready.
    pub children_check: TraversalBudget,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            artifact_hierarchy: TraversalBudget::new(3, 500, 1000),
            task_counts: TraversalBudget::new(1, 500, 1000),
            task_graph: TraversalBudget::new(2, 500, 1000),
            completion_cascade: TraversalBudget::new(2, 200, 500),
            children_check: TraversalBudget::new(2, 200, 500),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Traversal budgets
    pub traversal: TraversalConfig,
}

impl EngineConfig {
    /// Parse configuration from YAML and validate it.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        Self::from_yaml(&content)
    }

    /// Save configuration to a YAML file.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Check every budget.
    pub fn validate(&self) -> Result<()> {
        let t = &self.traversal;
        t.artifact_hierarchy.validate("artifact_hierarchy")?;
        t.task_counts.validate("task_counts")?;
        t.task_graph.validate("task_graph")?;
        t.completion_cascade.validate("completion_cascade")?;
        t.children_check.validate("children_check")?;
        if t.artifact_hierarchy.max_depth < 3 {
            return Err(Error::Config(
                "traversal.artifact_hierarchy: max_depth must be at least 3 to reach scenarios"
                    .to_string(),
            ));
        }
        if t.children_check.max_depth < 2 {
            return Err(Error::Config(
                "traversal.children_check: max_depth must be at least 2 to reach scenarios"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
