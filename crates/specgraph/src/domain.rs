//! Domain types for workflow artifacts and tasks.
//!
//! The store only knows property bags and type names. This module gives the
//! names the engine relies on a typed form, and decides how a missing or
//! malformed status reads.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use specgraph_store::{GraphObject, ObjectId, Properties};

/// Property keys the engine reads and writes.
pub mod props {
    /// Lifecycle status of any entity.
    pub const STATUS: &str = "status";
    /// Human-readable name (Change, Spec, ...).
    pub const NAME: &str = "name";
    /// Hierarchical task number such as "1.2".
    pub const NUMBER: &str = "number";
    /// Task description.
    pub const DESCRIPTION: &str = "description";
    /// Free-form task category.
    pub const TASK_TYPE: &str = "task_type";
    /// Task weight used by the critical path.
    pub const COMPLEXITY_POINTS: &str = "complexity_points";
    /// RFC 3339 timestamp set when a task is assigned.
    pub const STARTED_AT: &str = "started_at";
    /// RFC 3339 timestamp set when a task is completed.
    pub const COMPLETED_AT: &str = "completed_at";
    /// Hours between start and completion.
    pub const ACTUAL_HOURS: &str = "actual_hours";
    /// Files or links produced by a task.
    pub const ARTIFACTS: &str = "artifacts";
    /// How a task's result is verified.
    pub const VERIFICATION_METHOD: &str = "verification_method";
    /// Notes recorded at completion.
    pub const VERIFICATION_NOTES: &str = "verification_notes";
    /// Task tags.
    pub const TAGS: &str = "tags";
    /// RFC 3339 timestamp set when a change is archived.
    pub const ARCHIVED_AT: &str = "archived_at";
}

/// Entity types stored in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// Top-level unit of work
    Change,
    /// Why the change exists (one per change)
    Proposal,
    /// Behavior specification
    Spec,
    /// Requirement under a spec
    Requirement,
    /// Scenario under a requirement
    Scenario,
    /// Step of a scenario
    ScenarioStep,
    /// Technical design (one per change)
    Design,
    /// Unit of implementation work
    Task,
    /// Someone tasks can be assigned to
    Agent,
    /// Project-wide principles
    Constitution,
    /// Reusable implementation pattern
    Pattern,
    /// Discovered project context
    Context,
    /// Discovered UI component
    #[serde(rename = "UIComponent")]
    UiComponent,
}

impl EntityType {
    /// Every entity type, in display order.
    pub const ALL: [EntityType; 13] = [
        EntityType::Change,
        EntityType::Proposal,
        EntityType::Spec,
        EntityType::Requirement,
        EntityType::Scenario,
        EntityType::ScenarioStep,
        EntityType::Design,
        EntityType::Task,
        EntityType::Agent,
        EntityType::Constitution,
        EntityType::Pattern,
        EntityType::Context,
        EntityType::UiComponent,
    ];

    /// The type name used by the store.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Change => "Change",
            EntityType::Proposal => "Proposal",
            EntityType::Spec => "Spec",
            EntityType::Requirement => "Requirement",
            EntityType::Scenario => "Scenario",
            EntityType::ScenarioStep => "ScenarioStep",
            EntityType::Design => "Design",
            EntityType::Task => "Task",
            EntityType::Agent => "Agent",
            EntityType::Constitution => "Constitution",
            EntityType::Pattern => "Pattern",
            EntityType::Context => "Context",
            EntityType::UiComponent => "UIComponent",
        }
    }

    /// Parse a store type name. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// True for the types that follow the draft/ready lifecycle.
    pub fn is_workflow_artifact(self) -> bool {
        matches!(
            self,
            EntityType::Proposal
                | EntityType::Spec
                | EntityType::Requirement
                | EntityType::Scenario
                | EntityType::Design
        )
    }

    /// True if `object` is of this type.
    pub fn matches(self, object: &GraphObject) -> bool {
        object.object_type == self.as_str()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship types between entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelType {
    /// Change -> Proposal
    HasProposal,
    /// Change -> Spec
    HasSpec,
    /// Change -> Design
    HasDesign,
    /// Change -> Task
    HasTask,
    /// Spec -> Requirement
    HasRequirement,
    /// Requirement -> Scenario
    HasScenario,
    /// Task -> Task (parent to child)
    HasSubtask,
    /// Task -> Task (blocker to blocked)
    Blocks,
    /// Task -> Agent
    AssignedTo,
    /// Task -> Spec/Requirement it implements
    Implements,
}

impl RelType {
    /// The relationship name used by the store.
    pub fn as_str(self) -> &'static str {
        match self {
            RelType::HasProposal => "has_proposal",
            RelType::HasSpec => "has_spec",
            RelType::HasDesign => "has_design",
            RelType::HasTask => "has_task",
            RelType::HasRequirement => "has_requirement",
            RelType::HasScenario => "has_scenario",
            RelType::HasSubtask => "has_subtask",
            RelType::Blocks => "blocks",
            RelType::AssignedTo => "assigned_to",
            RelType::Implements => "implements",
        }
    }

    /// Relationship names for a traversal request.
    pub fn names(types: &[RelType]) -> Vec<String> {
        types.iter().map(|t| t.as_str().to_string()).collect()
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    /// Work in progress
    Active,
    /// Closed; no further artifacts expected
    Archived,
}

impl ChangeStatus {
    /// Read a change's status. Anything other than "archived" is active.
    pub fn of(object: &GraphObject) -> Self {
        match object.str_property(props::STATUS) {
            Some("archived") => ChangeStatus::Archived,
            _ => ChangeStatus::Active,
        }
    }

    /// The stored string form.
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeStatus::Active => "active",
            ChangeStatus::Archived => "archived",
        }
    }
}

/// Lifecycle of a workflow artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// Still being written
    #[default]
    Draft,
    /// Reviewed and complete
    Ready,
}

impl ArtifactStatus {
    /// Read an artifact's status from its properties.
    ///
    /// Only the exact value "ready" reads as ready. A missing, empty or
    /// unrecognized status reads as draft.
    pub fn from_properties(properties: &Properties) -> Self {
        match properties.get(props::STATUS).and_then(serde_json::Value::as_str) {
            Some("ready") => ArtifactStatus::Ready,
            _ => ArtifactStatus::Draft,
        }
    }

    /// Read an artifact's status.
    pub fn of(object: &GraphObject) -> Self {
        Self::from_properties(&object.properties)
    }

    /// True for [`ArtifactStatus::Ready`].
    pub fn is_ready(self) -> bool {
        self == ArtifactStatus::Ready
    }

    /// The stored string form.
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactStatus::Draft => "draft",
            ArtifactStatus::Ready => "ready",
        }
    }
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started
    Pending,
    /// Assigned and being worked on
    InProgress,
    /// Explicitly parked
    Blocked,
    /// Done (terminal)
    Completed,
}

impl TaskStatus {
    /// Parse a stored status string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "blocked" => Some(TaskStatus::Blocked),
            "completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }

    /// Read a task's status. `None` when missing or unrecognized.
    pub fn of(object: &GraphObject) -> Option<Self> {
        object.str_property(props::STATUS).and_then(Self::parse)
    }

    /// The stored string form.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of artifact an operation is about to add to a change.
///
/// Ordering guards look at this to decide whether they apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A proposal
    Proposal,
    /// A spec
    Spec,
    /// A requirement
    Requirement,
    /// A scenario
    Scenario,
    /// A scenario step
    ScenarioStep,
    /// A design
    Design,
    /// A task
    Task,
    /// A context entry
    Context,
    /// A UI component
    UiComponent,
}

impl ArtifactKind {
    /// The stored string form.
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Proposal => "proposal",
            ArtifactKind::Spec => "spec",
            ArtifactKind::Requirement => "requirement",
            ArtifactKind::Scenario => "scenario",
            ArtifactKind::ScenarioStep => "scenario_step",
            ArtifactKind::Design => "design",
            ArtifactKind::Task => "task",
            ArtifactKind::Context => "context",
            ArtifactKind::UiComponent => "ui_component",
        }
    }

    /// The entity type created for this kind.
    pub fn entity_type(self) -> EntityType {
        match self {
            ArtifactKind::Proposal => EntityType::Proposal,
            ArtifactKind::Spec => EntityType::Spec,
            ArtifactKind::Requirement => EntityType::Requirement,
            ArtifactKind::Scenario => EntityType::Scenario,
            ArtifactKind::ScenarioStep => EntityType::ScenarioStep,
            ArtifactKind::Design => EntityType::Design,
            ArtifactKind::Task => EntityType::Task,
            ArtifactKind::Context => EntityType::Context,
            ArtifactKind::UiComponent => EntityType::UiComponent,
        }
    }

    /// True for the kinds that sit under a spec in the hierarchy.
    pub fn is_spec_level(self) -> bool {
        matches!(
            self,
            ArtifactKind::Spec
                | ArtifactKind::Requirement
                | ArtifactKind::Scenario
                | ArtifactKind::ScenarioStep
        )
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "proposal" => Ok(ArtifactKind::Proposal),
            "spec" => Ok(ArtifactKind::Spec),
            "requirement" => Ok(ArtifactKind::Requirement),
            "scenario" => Ok(ArtifactKind::Scenario),
            "scenario_step" => Ok(ArtifactKind::ScenarioStep),
            "design" => Ok(ArtifactKind::Design),
            "task" => Ok(ArtifactKind::Task),
            "context" => Ok(ArtifactKind::Context),
            "ui_component" => Ok(ArtifactKind::UiComponent),
            other => Err(Error::InvalidArgument(format!(
                "unknown artifact kind '{other}'"
            ))),
        }
    }
}
