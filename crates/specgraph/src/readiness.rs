//! Readiness cascade over a change's artifact tree.
//!
//! A Spec is ready only if it is marked ready and every Requirement under it
//! is ready, and a Requirement only if every Scenario under it is ready.
//! Everything here is a pure function of one or two [`Snapshot`]s. Nodes that
//! a traversal budget cut off read as draft, and a truncated traversal never
//! reports anything as ready, so truncation can only make a change look less
//! ready than it is.

use crate::domain::{ArtifactStatus, EntityType, GraphObject, ObjectId, RelType, TaskStatus, props};
use crate::guards::GuardContext;
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Readiness of the proposal, specs and design of one change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReadiness {
    /// At least one proposal edge exists
    pub has_proposal: bool,
    /// Every proposal is ready
    pub proposal_ready: bool,
    /// At least one spec edge exists
    pub has_spec: bool,
    /// Number of specs
    pub spec_count: usize,
    /// Every spec, requirement and scenario is ready
    pub all_specs_ready: bool,
    /// At least one design edge exists
    pub has_design: bool,
    /// Every design is ready
    pub design_ready: bool,
}

/// Task counts of one change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    /// Tasks linked to the change, reachable or not
    pub total: usize,
    /// Tasks with status `completed`
    pub completed: usize,
    /// Tasks with status `pending`
    pub pending: usize,
}

impl ArtifactReadiness {
    /// Copy the findings into a guard context.
    pub fn apply_to(&self, context: &mut GuardContext) {
        context.has_proposal = self.has_proposal;
        context.proposal_ready = self.proposal_ready;
        context.has_spec = self.has_spec;
        context.spec_count = self.spec_count;
        context.all_specs_ready = self.all_specs_ready;
        context.has_design = self.has_design;
        context.design_ready = self.design_ready;
    }
}

impl TaskCounts {
    /// Copy the counts into a guard context.
    pub fn apply_to(&self, context: &mut GuardContext) {
        context.has_tasks = self.total > 0;
        context.task_count = self.total;
        context.completed_tasks = self.completed;
        context.pending_tasks = self.pending;
    }
}

fn all_ready(snapshot: &Snapshot, ids: &[&ObjectId]) -> bool {
    ids.iter().all(|id| snapshot.artifact_status(id).is_ready())
}

/// True if a requirement and every scenario under it are ready.
fn requirement_ready(snapshot: &Snapshot, requirement: &ObjectId) -> bool {
    snapshot.artifact_status(requirement).is_ready()
        && all_ready(snapshot, &snapshot.targets(requirement, RelType::HasScenario))
}

/// True if a spec and its whole subtree are ready.
fn spec_ready(snapshot: &Snapshot, spec: &ObjectId) -> bool {
    snapshot.artifact_status(spec).is_ready()
        && snapshot
            .targets(spec, RelType::HasRequirement)
            .iter()
            .all(|requirement| requirement_ready(snapshot, requirement))
}

/// Readiness of a change's artifacts from a traversal covering the spec tree.
///
/// A truncated traversal may have dropped unready children or siblings, so
/// none of the `*_ready` flags is set when the snapshot is truncated.
pub fn assess_artifacts(snapshot: &Snapshot, change_id: &ObjectId) -> ArtifactReadiness {
    let proposals = snapshot.targets(change_id, RelType::HasProposal);
    let specs = snapshot.targets(change_id, RelType::HasSpec);
    let designs = snapshot.targets(change_id, RelType::HasDesign);
    let complete = !snapshot.is_truncated();

    ArtifactReadiness {
        has_proposal: !proposals.is_empty(),
        proposal_ready: complete && !proposals.is_empty() && all_ready(snapshot, &proposals),
        has_spec: !specs.is_empty(),
        spec_count: specs.len(),
        all_specs_ready: complete
            && !specs.is_empty()
            && specs.iter().all(|spec| spec_ready(snapshot, spec)),
        has_design: !designs.is_empty(),
        design_ready: complete && !designs.is_empty() && all_ready(snapshot, &designs),
    }
}

/// Task counts from a traversal covering the change's `has_task` edges.
///
/// Only the exact statuses `completed` and `pending` are counted. A task edge
/// whose node was cut off counts towards `total` only. On a truncated
/// traversal nothing counts as completed.
pub fn count_tasks(snapshot: &Snapshot, change_id: &ObjectId) -> TaskCounts {
    let tasks = snapshot.targets(change_id, RelType::HasTask);
    let mut counts = TaskCounts {
        total: tasks.len(),
        ..TaskCounts::default()
    };
    let complete = !snapshot.is_truncated();

    for task in tasks {
        match snapshot.object(task).and_then(TaskStatus::of) {
            Some(TaskStatus::Completed) if complete => counts.completed += 1,
            Some(TaskStatus::Pending) => counts.pending += 1,
            _ => {}
        }
    }

    counts
}

/// Draft counts across a change's spec tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecBreakdown {
    /// Specs linked to the change
    pub specs: usize,
    /// Specs not ready
    pub draft_specs: usize,
    /// Requirements under those specs
    pub requirements: usize,
    /// Requirements not ready
    pub draft_requirements: usize,
    /// Scenarios under those requirements
    pub scenarios: usize,
    /// Scenarios not ready
    pub draft_scenarios: usize,
}

impl SpecBreakdown {
    /// Count draft artifacts in the spec tree of a change.
    pub fn of(snapshot: &Snapshot, change_id: &ObjectId) -> Self {
        let mut breakdown = Self::default();

        for spec in snapshot.targets(change_id, RelType::HasSpec) {
            breakdown.specs += 1;
            if !snapshot.artifact_status(spec).is_ready() {
                breakdown.draft_specs += 1;
            }

            for requirement in snapshot.targets(spec, RelType::HasRequirement) {
                breakdown.requirements += 1;
                if !snapshot.artifact_status(requirement).is_ready() {
                    breakdown.draft_requirements += 1;
                }

                for scenario in snapshot.targets(requirement, RelType::HasScenario) {
                    breakdown.scenarios += 1;
                    if !snapshot.artifact_status(scenario).is_ready() {
                        breakdown.draft_scenarios += 1;
                    }
                }
            }
        }

        breakdown
    }

    /// True when nothing in the tree is draft.
    pub fn is_all_ready(&self) -> bool {
        self.draft_specs == 0 && self.draft_requirements == 0 && self.draft_scenarios == 0
    }
}

impl fmt::Display for SpecBreakdown {
    /// "no specs", "all ready", or the non-zero draft counts bottom-up,
    /// e.g. "1/4 scenarios draft, 2/2 specs draft".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.specs == 0 {
            return f.write_str("no specs");
        }

        let parts: Vec<String> = [
            (self.draft_scenarios, self.scenarios, "scenarios"),
            (self.draft_requirements, self.requirements, "requirements"),
            (self.draft_specs, self.specs, "specs"),
        ]
        .into_iter()
        .filter(|(draft, _, _)| *draft > 0)
        .map(|(draft, total, label)| format!("{draft}/{total} {label} draft"))
        .collect();

        if parts.is_empty() {
            f.write_str("all ready")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// A child that keeps its parent from being marked ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadyChild {
    /// Primary ID of the child
    pub id: ObjectId,
    /// Entity type of the child
    pub entity_type: EntityType,
    /// Child name, empty when unknown
    pub name: String,
    /// Current status
    pub status: ArtifactStatus,
}

impl UnreadyChild {
    fn new(snapshot: &Snapshot, id: &ObjectId, expected: EntityType) -> Self {
        let object = snapshot.object(id);
        Self {
            id: id.clone(),
            entity_type: object
                .and_then(|o| EntityType::parse(&o.object_type))
                .unwrap_or(expected),
            name: object
                .and_then(|o: &GraphObject| o.str_property(props::NAME))
                .unwrap_or_default()
                .to_string(),
            status: snapshot.artifact_status(id),
        }
    }
}

/// Children of `root` that are not ready.
///
/// For a Spec: its requirements and the scenarios under them. For a
/// Requirement: its scenarios. Other types have no structural children.
///
/// Only children present in the snapshot can be named. Callers must check
/// [`Snapshot::is_truncated`] before reading an empty result as all ready.
pub fn find_unready_children(
    snapshot: &Snapshot,
    root: &ObjectId,
    root_type: EntityType,
) -> Vec<UnreadyChild> {
    let mut blockers = Vec::new();

    let check_scenarios = |requirement: &ObjectId, blockers: &mut Vec<UnreadyChild>| {
        for scenario in snapshot.targets(requirement, RelType::HasScenario) {
            if !snapshot.artifact_status(scenario).is_ready() {
                blockers.push(UnreadyChild::new(snapshot, scenario, EntityType::Scenario));
            }
        }
    };

    match root_type {
        EntityType::Spec => {
            for requirement in snapshot.targets(root, RelType::HasRequirement) {
                if !snapshot.artifact_status(requirement).is_ready() {
                    blockers.push(UnreadyChild::new(
                        snapshot,
                        requirement,
                        EntityType::Requirement,
                    ));
                }
                check_scenarios(requirement, &mut blockers);
            }
        }
        EntityType::Requirement => check_scenarios(root, &mut blockers),
        _ => {}
    }

    blockers
}

/// Where a change is in the propose -> specify -> design -> implement flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    /// Proposal missing or not ready
    Propose,
    /// Specs missing or not all ready
    Specify,
    /// Design missing or not ready
    Design,
    /// Tasks missing or incomplete
    Implement,
    /// Everything done; ready to archive
    Complete,
}

impl WorkflowStage {
    /// Derive the stage from a populated context.
    pub fn of(context: &GuardContext) -> Self {
        if !context.has_proposal || !context.proposal_ready {
            WorkflowStage::Propose
        } else if !context.has_spec || !context.all_specs_ready {
            WorkflowStage::Specify
        } else if !context.has_design || !context.design_ready {
            WorkflowStage::Design
        } else if !context.has_tasks || context.incomplete_tasks() > 0 {
            WorkflowStage::Implement
        } else {
            WorkflowStage::Complete
        }
    }

    /// The serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStage::Propose => "propose",
            WorkflowStage::Specify => "specify",
            WorkflowStage::Design => "design",
            WorkflowStage::Implement => "implement",
            WorkflowStage::Complete => "complete",
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The next action to take on a change, most urgent first.
///
/// Only the first unmet prerequisite is reported.
pub fn next_steps(context: &GuardContext) -> Vec<String> {
    let step = if !context.has_proposal {
        "Add a proposal to the change.".to_string()
    } else if !context.proposal_ready {
        "Mark the proposal ready.".to_string()
    } else if !context.has_spec {
        "Add specs to the change.".to_string()
    } else if !context.all_specs_ready {
        "Mark every scenario, requirement and spec ready, bottom-up.".to_string()
    } else if !context.has_design {
        "Add a design to the change.".to_string()
    } else if !context.design_ready {
        "Mark the design ready.".to_string()
    } else if !context.has_tasks {
        "Generate tasks for the change.".to_string()
    } else if context.incomplete_tasks() > 0 {
        format!("Complete {} remaining task(s).", context.incomplete_tasks())
    } else {
        "All tasks are complete. Archive the change.".to_string()
    };

    vec![step]
}

/// True once every artifact exists, is ready, and every task is completed.
pub fn ready_to_archive(context: &GuardContext) -> bool {
    WorkflowStage::of(context) == WorkflowStage::Complete && context.task_count > 0
}
