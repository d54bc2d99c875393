//! Context population.
//!
//! The only place the guard engine touches the store. Each function issues a
//! fixed number of bounded reads, runs them concurrently, and writes the
//! results into a request-scoped [`GuardContext`].

use crate::config::EngineConfig;
use crate::domain::{EntityType, ObjectId, RelType};
use crate::error::{Error, Result};
use crate::guards::GuardContext;
use crate::readiness::{assess_artifacts, count_tasks};
use crate::snapshot::Snapshot;
use specgraph_store::{Direction, GraphStore};
use tracing::debug;

/// Relationships that make up a change's artifact tree.
const ARTIFACT_RELATIONSHIPS: [RelType; 5] = [
    RelType::HasProposal,
    RelType::HasSpec,
    RelType::HasDesign,
    RelType::HasRequirement,
    RelType::HasScenario,
];

/// The traversals a change population read.
///
/// Returned so callers can derive further findings without fetching again.
#[derive(Debug, Clone, Default)]
pub struct ChangeSnapshots {
    /// Change -> proposal / spec / design, spec -> requirement -> scenario
    pub artifacts: Snapshot,
    /// Change -> task
    pub tasks: Snapshot,
}

/// Fill the change-level fields of `context` for `context.change_id`.
///
/// The artifact tree needs three hops and the task list one, so they are
/// fetched as two separate bounded traversals, concurrently.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the context names no change, and
/// propagates store failures.
pub async fn populate_change_state(
    store: &dyn GraphStore,
    config: &EngineConfig,
    context: &mut GuardContext,
) -> Result<ChangeSnapshots> {
    let change_id = context
        .change_id
        .clone()
        .ok_or_else(|| Error::InvalidArgument("context has no change".to_string()))?;

    let budgets = &config.traversal;
    let artifact_request =
        budgets
            .artifact_hierarchy
            .request(&change_id, Direction::Outgoing, &ARTIFACT_RELATIONSHIPS);
    let task_request =
        budgets
            .task_counts
            .request(&change_id, Direction::Outgoing, &[RelType::HasTask]);

    let (artifacts, tasks) =
        tokio::try_join!(store.expand(&artifact_request), store.expand(&task_request))?;

    let snapshots = ChangeSnapshots {
        artifacts: Snapshot::from_response(artifacts),
        tasks: Snapshot::from_response(tasks),
    };

    let readiness = assess_artifacts(&snapshots.artifacts, &change_id);
    let counts = count_tasks(&snapshots.tasks, &change_id);
    readiness.apply_to(context);
    counts.apply_to(context);

    debug!(
        change_id = %change_id,
        has_proposal = context.has_proposal,
        spec_count = context.spec_count,
        all_specs_ready = context.all_specs_ready,
        task_count = context.task_count,
        completed_tasks = context.completed_tasks,
        "Populated change state"
    );

    Ok(snapshots)
}

/// Project-wide counts that gate change creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectCounts {
    /// Constitution entities
    pub constitutions: usize,
    /// Pattern entities
    pub patterns: usize,
    /// Context entities
    pub contexts: usize,
    /// UI component entities
    pub components: usize,
}

impl ProjectCounts {
    /// Copy the counts into a guard context.
    pub fn apply_to(&self, context: &mut GuardContext) {
        context.has_constitution = self.constitutions > 0;
        context.has_patterns = self.patterns > 0;
        context.pattern_count = self.patterns;
        context.context_count = self.contexts;
        context.component_count = self.components;
    }
}

/// Fill the project-level fields of `context`.
///
/// One count per entity type, run concurrently and joined before merging.
///
/// # Errors
///
/// Propagates the first store failure.
pub async fn populate_project_state(
    store: &dyn GraphStore,
    context: &mut GuardContext,
) -> Result<ProjectCounts> {
    let (constitutions, patterns, contexts, components) = tokio::try_join!(
        store.count_objects(EntityType::Constitution.as_str()),
        store.count_objects(EntityType::Pattern.as_str()),
        store.count_objects(EntityType::Context.as_str()),
        store.count_objects(EntityType::UiComponent.as_str()),
    )?;

    let counts = ProjectCounts {
        constitutions,
        patterns,
        contexts,
        components,
    };
    counts.apply_to(context);

    debug!(?counts, "Populated project state");
    Ok(counts)
}

/// Build a context for `change_id` and populate it.
pub(crate) async fn change_context(
    store: &dyn GraphStore,
    config: &EngineConfig,
    change_id: &ObjectId,
) -> Result<(GuardContext, ChangeSnapshots)> {
    let mut context = GuardContext::for_change(change_id.clone());
    let snapshots = populate_change_state(store, config, &mut context).await?;
    Ok((context, snapshots))
}
