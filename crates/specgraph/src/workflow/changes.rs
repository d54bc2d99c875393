//! Change-level operations: guard checks, status, readiness, archival.

use super::{Guarded, Workflow};
use crate::config::TraversalBudget;
use crate::domain::{
    ArtifactKind, ArtifactStatus, ChangeStatus, EntityType, GraphObject, ObjectId, Properties,
    RelType, props,
};
use crate::error::{Error, Result};
use crate::guards::{GuardContext, GuardSet, Outcome, Runner};
use crate::identity::EntityIdentity;
use crate::populate::{self, change_context};
use crate::readiness::{
    SpecBreakdown, UnreadyChild, WorkflowStage, find_unready_children, next_steps,
    ready_to_archive,
};
use crate::snapshot::Snapshot;
use crate::transitions::validate_artifact_transition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use specgraph_store::Direction;
use tracing::{debug, info, warn};

/// Presence and readiness of one artifact category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    /// At least one artifact of this category exists
    pub exists: bool,
    /// Every artifact of this category is ready
    pub ready: bool,
    /// How many exist
    pub count: usize,
    /// One-line detail, when there is something to say
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Artifact summaries of a change, by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactOverview {
    /// The proposal
    pub proposal: ArtifactSummary,
    /// Specs with their requirement and scenario trees
    pub specs: ArtifactSummary,
    /// The design
    pub design: ArtifactSummary,
    /// Tasks; `ready` means every task is completed
    pub tasks: ArtifactSummary,
}

/// Where a change stands and what to do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatusReport {
    /// Primary ID of the change
    pub change_id: ObjectId,
    /// Change name
    pub change_name: String,
    /// Active or archived
    pub change_status: ChangeStatus,
    /// Current workflow stage
    pub stage: WorkflowStage,
    /// Per-category artifact state
    pub artifacts: ArtifactOverview,
    /// Draft counts in the spec tree
    pub spec_breakdown: SpecBreakdown,
    /// The next action to take
    pub next_steps: Vec<String>,
    /// Every artifact is ready and every task completed
    pub ready_to_archive: bool,
}

/// Result of a request to mark an artifact ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkReadyReport {
    /// Primary ID of the artifact
    pub entity_id: ObjectId,
    /// Artifact type
    pub entity_type: EntityType,
    /// Artifact name, empty when unset
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Status after the request
    pub status: ArtifactStatus,
    /// True if this request changed the status
    pub marked: bool,
    /// What happened
    pub message: String,
    /// Children that must be marked ready first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blockers: Vec<UnreadyChild>,
    /// How to clear the blockers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remedy: Option<String>,
}

/// An archived change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedChange {
    /// Primary ID of the change
    pub change_id: ObjectId,
    /// Change name
    pub change_name: String,
    /// When the change was archived
    pub archived_at: DateTime<Utc>,
    /// What happened
    pub message: String,
    /// Warnings and suggestions raised by the archive guards
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub advisories: String,
}

const SPEC_CHILDREN: &[RelType] = &[RelType::HasRequirement, RelType::HasScenario];
const REQUIREMENT_CHILDREN: &[RelType] = &[RelType::HasScenario];

fn name_of(object: &GraphObject) -> String {
    object.str_property(props::NAME).unwrap_or_default().to_string()
}

impl Workflow {
    /// Fetch a change and populate a guard context for it.
    ///
    /// # Errors
    ///
    /// Fails if the change does not exist, is not a Change, or a traversal
    /// fails.
    pub async fn populate_change_state(&self, change_id: &ObjectId) -> Result<GuardContext> {
        let change = self.fetch(change_id, EntityType::Change).await?;
        let (mut context, _) =
            change_context(self.store(), self.config(), &EntityIdentity::of(&change).key).await?;
        context.change_name = name_of(&change);
        Ok(context)
    }

    /// Run a guard set over a populated context.
    pub fn check(context: &GuardContext, set: GuardSet) -> Outcome {
        Runner::run(context, set.guards())
    }

    /// Guards for creating a change called `name`.
    ///
    /// Reads project-wide counts only; nothing is created.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn check_new_change(&self, name: &str, force: bool) -> Result<Outcome> {
        let mut context = GuardContext {
            change_name: name.to_string(),
            force,
            ..GuardContext::default()
        };
        populate::populate_project_state(self.store(), &mut context).await?;

        let outcome = Self::check(&context, GuardSet::NewChange);
        debug!(name, blocked = outcome.blocked, "Checked new change");
        Ok(outcome)
    }

    /// Guards for adding an artifact of `kind` to a change.
    ///
    /// # Errors
    ///
    /// Fails if the change cannot be fetched or populated.
    pub async fn check_artifact(
        &self,
        change_id: &ObjectId,
        kind: ArtifactKind,
        force: bool,
    ) -> Result<Outcome> {
        let context = self
            .populate_change_state(change_id)
            .await?
            .with_artifact(kind)
            .with_force(force);

        let outcome = Self::check(&context, GuardSet::Artifact);
        debug!(change_id = %change_id, %kind, blocked = outcome.blocked, "Checked artifact");
        Ok(outcome)
    }

    /// Summarize a change: stage, artifacts, spec breakdown and next step.
    ///
    /// # Errors
    ///
    /// Fails if the change cannot be fetched or populated.
    pub async fn change_status(&self, change_id: &ObjectId) -> Result<ChangeStatusReport> {
        let change = self.fetch(change_id, EntityType::Change).await?;
        let key = EntityIdentity::of(&change).key;
        let (context, snapshots) = change_context(self.store(), self.config(), &key).await?;

        let breakdown = SpecBreakdown::of(&snapshots.artifacts, &key);
        let artifacts = ArtifactOverview {
            proposal: ArtifactSummary {
                exists: context.has_proposal,
                ready: context.proposal_ready,
                count: snapshots.artifacts.targets(&key, RelType::HasProposal).len(),
                detail: None,
            },
            specs: ArtifactSummary {
                exists: context.has_spec,
                ready: context.all_specs_ready,
                count: context.spec_count,
                detail: Some(breakdown.to_string()),
            },
            design: ArtifactSummary {
                exists: context.has_design,
                ready: context.design_ready,
                count: snapshots.artifacts.targets(&key, RelType::HasDesign).len(),
                detail: None,
            },
            tasks: ArtifactSummary {
                exists: context.has_tasks,
                ready: context.has_tasks && context.incomplete_tasks() == 0,
                count: context.task_count,
                detail: Some(format!(
                    "{}/{} completed",
                    context.completed_tasks, context.task_count
                )),
            },
        };

        Ok(ChangeStatusReport {
            change_id: key,
            change_name: name_of(&change),
            change_status: ChangeStatus::of(&change),
            stage: WorkflowStage::of(&context),
            artifacts,
            spec_breakdown: breakdown,
            next_steps: next_steps(&context),
            ready_to_archive: ready_to_archive(&context),
        })
    }

    /// Mark a workflow artifact ready once all of its children are ready.
    ///
    /// Unready children are reported in [`MarkReadyReport::blockers`] and the
    /// artifact is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedType`] for entities that are not workflow
    /// artifacts, and propagates store failures.
    pub async fn mark_ready(&self, entity_id: &ObjectId) -> Result<MarkReadyReport> {
        let object = self.store.get_object(entity_id).await?;
        let entity_type = EntityType::parse(&object.object_type)
            .filter(|t| t.is_workflow_artifact())
            .ok_or_else(|| Error::UnexpectedType {
                id: entity_id.clone(),
                expected: "workflow artifact".to_string(),
                actual: object.object_type.clone(),
            })?;

        let key = EntityIdentity::of(&object).key;
        let mut report = MarkReadyReport {
            entity_id: key.clone(),
            entity_type,
            name: name_of(&object),
            status: ArtifactStatus::of(&object),
            marked: false,
            message: String::new(),
            blockers: Vec::new(),
            remedy: None,
        };

        if report.status.is_ready() {
            report.message = "Already ready".to_string();
            return Ok(report);
        }

        let Some(blockers) = self.unready_children(&key, entity_type).await? else {
            report.message =
                "Cannot verify children: the traversal exceeded traversal.children_check"
                    .to_string();
            report.remedy = Some("Raise traversal.children_check, then retry.".to_string());
            warn!(entity_id = %key, "Mark ready refused on a truncated traversal");
            return Ok(report);
        };
        if !blockers.is_empty() {
            report.message = format!(
                "Cannot mark as ready: {} child artifact(s) are not ready",
                blockers.len()
            );
            report.blockers = blockers;
            report.remedy = Some("Mark every child artifact ready first, then retry.".to_string());
            debug!(entity_id = %key, blockers = report.blockers.len(), "Mark ready refused");
            return Ok(report);
        }

        validate_artifact_transition(&key, report.status, ArtifactStatus::Ready)?;

        let mut properties = Properties::new();
        properties.insert(props::STATUS.to_string(), json!(ArtifactStatus::Ready.as_str()));
        self.store.update_object(&key, properties).await?;

        info!(entity_id = %key, %entity_type, "Marked artifact ready");
        report.status = ArtifactStatus::Ready;
        report.marked = true;
        report.message = format!("Marked {entity_type} as ready");
        Ok(report)
    }

    /// Children of an artifact that are not ready, from one bounded traversal.
    ///
    /// `None` when the traversal was truncated and children may be missing.
    async fn unready_children(
        &self,
        key: &ObjectId,
        entity_type: EntityType,
    ) -> Result<Option<Vec<UnreadyChild>>> {
        let budget = self.config().traversal.children_check;
        let (budget, relationships): (TraversalBudget, &[RelType]) = match entity_type {
            EntityType::Spec => (budget, SPEC_CHILDREN),
            EntityType::Requirement => (
                TraversalBudget {
                    max_depth: 1,
                    ..budget
                },
                REQUIREMENT_CHILDREN,
            ),
            _ => return Ok(Some(Vec::new())),
        };

        let response = self
            .store
            .expand(&budget.request(key, Direction::Outgoing, relationships))
            .await?;
        let snapshot = Snapshot::from_response(response);
        if snapshot.is_truncated() {
            return Ok(None);
        }

        Ok(Some(find_unready_children(&snapshot, key, entity_type)))
    }

    /// Archive a change, subject to the archive guards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInState`] if the change is already archived,
    /// and propagates store failures.
    pub async fn archive_change(
        &self,
        change_id: &ObjectId,
        force: bool,
    ) -> Result<Guarded<ArchivedChange>> {
        let change = self.fetch(change_id, EntityType::Change).await?;
        let key = EntityIdentity::of(&change).key;
        if ChangeStatus::of(&change) == ChangeStatus::Archived {
            return Err(Error::AlreadyInState {
                id: key,
                status: ChangeStatus::Archived.as_str().to_string(),
            });
        }

        let (context, _) = change_context(self.store(), self.config(), &key).await?;
        let outcome = Self::check(&context.with_force(force), GuardSet::Archive);
        if outcome.blocked {
            debug!(change_id = %key, "Archive blocked by guards");
            return Ok(Guarded::Blocked(outcome));
        }

        let archived_at = Utc::now();
        let mut properties = Properties::new();
        properties.insert(props::STATUS.to_string(), json!(ChangeStatus::Archived.as_str()));
        properties.insert(props::ARCHIVED_AT.to_string(), json!(archived_at.to_rfc3339()));
        self.store.update_object(&key, properties).await?;

        let change_name = name_of(&change);
        info!(change_id = %key, name = %change_name, forced = force, "Archived change");

        Ok(Guarded::Proceeded {
            value: ArchivedChange {
                message: format!("Archived change \"{change_name}\""),
                change_id: key,
                change_name,
                archived_at,
                advisories: outcome.advisory_message(),
            },
            outcome,
        })
    }
}
