//! Task operations: generation, availability, critical path, assignment and
//! completion.

use super::{CancellationSignal, Guarded, Workflow};
use crate::domain::{
    ArtifactKind, EntityType, GraphObject, ObjectId, Properties, RelType, TaskStatus, props,
};
use crate::error::{Error, Result};
use crate::guards::GuardSet;
use crate::identity::EntityIdentity;
use crate::populate::change_context;
use crate::snapshot::Snapshot;
use crate::tasks::{Progress, TaskGraph, TaskRecord, TaskSummary, compare_task_numbers};
use crate::transitions::validate_task_transition;
use chrono::{DateTime, Utc};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use serde_json::json;
use specgraph_store::{Direction, NewObject};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Relationships the task graph traversal follows from a change.
const TASK_GRAPH_RELATIONSHIPS: [RelType; 3] =
    [RelType::HasTask, RelType::Blocks, RelType::AssignedTo];

/// One task to create in [`Workflow::generate_tasks`].
///
/// Other tasks of the same batch are referenced by number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Hierarchical number, unique within the batch
    pub number: String,
    /// What the task does
    pub description: String,
    /// Category such as "implementation" or "testing"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    /// Weight on the critical path
    #[serde(default)]
    pub complexity_points: u32,
    /// How to verify completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<String>,
    /// Entity this task implements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implements: Option<ObjectId>,
    /// Numbers of the tasks this one blocks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<String>,
    /// Number of the parent task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_number: Option<String>,
    /// Tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl TaskDefinition {
    /// A definition with a number and description.
    pub fn new(number: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    fn to_new_object(&self) -> NewObject {
        let mut object = NewObject::new(EntityType::Task.as_str())
            .with_property(props::NUMBER, self.number.as_str())
            .with_property(props::DESCRIPTION, self.description.as_str())
            .with_property(props::STATUS, TaskStatus::Pending.as_str())
            .with_property(props::COMPLEXITY_POINTS, self.complexity_points);
        if let Some(task_type) = &self.task_type {
            object = object.with_property(props::TASK_TYPE, task_type.as_str());
        }
        if let Some(method) = &self.verification_method {
            object = object.with_property(props::VERIFICATION_METHOD, method.as_str());
        }
        if !self.tags.is_empty() {
            object = object.with_property(props::TAGS, self.tags.clone());
        }
        object
    }
}

/// Tasks created by [`Workflow::generate_tasks`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTasks {
    /// Primary ID of the change
    pub change_id: ObjectId,
    /// Created tasks, in definition order
    pub tasks: Vec<TaskSummary>,
    /// Relationships created, `has_task` included
    pub relationship_count: usize,
    /// Sum of complexity points
    pub total_complexity: u64,
    /// What happened
    pub message: String,
}

/// Tasks that can be picked up now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableTasks {
    /// Primary ID of the change
    pub change_id: ObjectId,
    /// Available tasks, by number
    pub tasks: Vec<TaskSummary>,
    /// How many tasks could be worked on concurrently
    pub parallel_capacity: usize,
    /// The traversal hit its budget and nothing was reported available
    pub truncated: bool,
    /// What happened
    pub message: String,
}

/// Critical path and progress of a change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPathReport {
    /// Primary ID of the change
    pub change_id: ObjectId,
    /// Highest-weight chain of tasks, first blocker first
    pub path: Vec<TaskSummary>,
    /// Sum of complexity points along the path
    pub cost: u64,
    /// Points-based progress over all tasks
    pub progress: Progress,
    /// Number of tasks available right now
    pub parallel_capacity: usize,
    /// The traversal hit its budget; the path may be incomplete
    pub truncated: bool,
    /// What happened
    pub message: String,
}

/// A task assigned to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedTask {
    /// Primary ID of the task
    pub task_id: ObjectId,
    /// Primary ID of the agent
    pub agent_id: ObjectId,
    /// Task number
    pub number: String,
    /// Status after assignment
    pub status: TaskStatus,
    /// When work started
    pub started_at: DateTime<Utc>,
    /// What happened
    pub message: String,
}

/// Optional details recorded when a task is completed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCompletion {
    /// Files or documents produced
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    /// How completion was verified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_notes: Option<String>,
}

/// A completed task and what it unblocked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTask {
    /// Primary ID of the task
    pub task_id: ObjectId,
    /// Task number
    pub number: String,
    /// When the task was completed
    pub completed_at: DateTime<Utc>,
    /// Hours since `started_at`, when the task had one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_hours: Option<f64>,
    /// Tasks whose last blocker this was
    pub unblocked: Vec<TaskSummary>,
    /// The follow-up traversal hit its budget and nothing was reported
    /// unblocked
    pub truncated: bool,
    /// What happened
    pub message: String,
}

/// Reject malformed batches before anything is written.
///
/// Numbers must be non-empty and unique, `blocks` and parent references must
/// name tasks in the batch, and the `blocks` edges must not form a cycle.
fn validate_definitions(definitions: &[TaskDefinition]) -> Result<()> {
    if definitions.is_empty() {
        return Err(Error::InvalidArgument(
            "at least one task is required".to_string(),
        ));
    }

    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes = HashMap::new();
    for definition in definitions {
        let number = definition.number.trim();
        if number.is_empty() {
            return Err(Error::InvalidArgument(
                "task number must not be empty".to_string(),
            ));
        }
        if nodes.contains_key(number) {
            return Err(Error::InvalidArgument(format!(
                "duplicate task number '{number}'"
            )));
        }
        nodes.insert(number, graph.add_node(number));
    }

    for definition in definitions {
        let number = definition.number.trim();
        let from = nodes[number];
        for blocked in &definition.blocks {
            let to = nodes.get(blocked.trim()).ok_or_else(|| {
                Error::InvalidArgument(format!("task {number} blocks unknown task '{blocked}'"))
            })?;
            graph.update_edge(from, *to, ());
        }
        if let Some(parent) = &definition.parent_task_number {
            let parent = parent.trim();
            if parent == number || !nodes.contains_key(parent) {
                return Err(Error::InvalidArgument(format!(
                    "task {number} has invalid parent '{parent}'"
                )));
            }
        }
    }

    if let Err(cycle) = toposort(&graph, None) {
        let mut task_ids: Vec<String> = tarjan_scc(&graph)
            .into_iter()
            .find(|component| component.contains(&cycle.node_id()))
            .unwrap_or_else(|| vec![cycle.node_id()])
            .into_iter()
            .map(|node| graph[node].to_string())
            .collect();
        task_ids.sort_by(|a, b| compare_task_numbers(a, b));
        return Err(Error::DependencyCycle { task_ids });
    }

    Ok(())
}

/// Counts of writes applied by a batch, for cancellation reports.
#[derive(Debug, Default)]
struct Applied {
    objects: usize,
    relationships: usize,
}

impl Applied {
    fn check(&self, cancel: &CancellationSignal) -> Result<()> {
        if cancel.is_cancelled() {
            warn!(
                created_objects = self.objects,
                created_relationships = self.relationships,
                "Batch cancelled; created entities are left in place"
            );
            return Err(Error::Cancelled {
                created_objects: self.objects,
                created_relationships: self.relationships,
            });
        }
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 3_600_000.0
}

impl Workflow {
    /// Create a batch of tasks for a change.
    ///
    /// Runs the artifact guards for [`ArtifactKind::Task`] first. Tasks are
    /// created in definition order with their `has_task` edges, then the
    /// `blocks`, `has_subtask` and `implements` edges. `cancel` is checked
    /// before every write.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] / [`Error::DependencyCycle`] for a
    ///   malformed batch, before anything is written
    /// - [`Error::Cancelled`] when `cancel` fires; earlier writes remain
    /// - store failures
    pub async fn generate_tasks(
        &self,
        change_id: &ObjectId,
        definitions: &[TaskDefinition],
        cancel: &CancellationSignal,
    ) -> Result<Guarded<GeneratedTasks>> {
        validate_definitions(definitions)?;

        let change = self.fetch(change_id, EntityType::Change).await?;
        let key = EntityIdentity::of(&change).key;
        let (context, _) = change_context(self.store(), self.config(), &key).await?;
        let outcome = Self::check(
            &context.with_artifact(ArtifactKind::Task),
            GuardSet::Artifact,
        );
        if outcome.blocked {
            debug!(change_id = %key, "Task generation blocked by guards");
            return Ok(Guarded::Blocked(outcome));
        }

        let mut applied = Applied::default();
        let mut ids: HashMap<&str, ObjectId> = HashMap::new();
        let mut tasks = Vec::with_capacity(definitions.len());

        for definition in definitions {
            applied.check(cancel)?;
            let created = self.store.create_object(definition.to_new_object()).await?;
            applied.objects += 1;

            let record = TaskRecord::from_object(&created);
            let task_id = record.id().clone();

            applied.check(cancel)?;
            self.store
                .create_relationship(
                    RelType::HasTask.as_str(),
                    &key,
                    &task_id,
                    Properties::new(),
                )
                .await?;
            applied.relationships += 1;

            ids.insert(definition.number.trim(), task_id);
            tasks.push(TaskSummary::from(&record));
        }

        // Every number below was checked by validate_definitions
        for definition in definitions {
            let task_id = &ids[definition.number.trim()];

            for blocked in &definition.blocks {
                applied.check(cancel)?;
                let blocked_id = &ids[blocked.trim()];
                self.store
                    .create_relationship(
                        RelType::Blocks.as_str(),
                        task_id,
                        blocked_id,
                        Properties::new(),
                    )
                    .await?;
                applied.relationships += 1;
            }

            if let Some(parent) = &definition.parent_task_number {
                applied.check(cancel)?;
                let parent_id = &ids[parent.trim()];
                self.store
                    .create_relationship(
                        RelType::HasSubtask.as_str(),
                        parent_id,
                        task_id,
                        Properties::new(),
                    )
                    .await?;
                applied.relationships += 1;
            }

            if let Some(target) = &definition.implements {
                applied.check(cancel)?;
                self.store
                    .create_relationship(
                        RelType::Implements.as_str(),
                        task_id,
                        target,
                        Properties::new(),
                    )
                    .await?;
                applied.relationships += 1;
            }
        }

        let total_complexity = definitions
            .iter()
            .map(|d| u64::from(d.complexity_points))
            .sum();

        info!(
            change_id = %key,
            tasks = tasks.len(),
            relationships = applied.relationships,
            "Generated tasks"
        );

        Ok(Guarded::Proceeded {
            value: GeneratedTasks {
                message: format!(
                    "Generated {} tasks with {} relationships",
                    tasks.len(),
                    applied.relationships
                ),
                change_id: key,
                tasks,
                relationship_count: applied.relationships,
                total_complexity,
            },
            outcome,
        })
    }

    /// Fetch and build the task graph of a change.
    async fn task_graph(&self, change_id: &ObjectId) -> Result<(ObjectId, TaskGraph)> {
        let change = self.fetch(change_id, EntityType::Change).await?;
        let key = EntityIdentity::of(&change).key;

        let request = self.config().traversal.task_graph.request(
            &key,
            Direction::Both,
            &TASK_GRAPH_RELATIONSHIPS,
        );
        let snapshot = Snapshot::from_response(self.store.expand(&request).await?);
        let graph = TaskGraph::for_change(&snapshot, &key);

        Ok((key, graph))
    }

    /// Tasks of a change that are pending, unassigned and unblocked.
    ///
    /// # Errors
    ///
    /// Fails if the change cannot be fetched or traversed.
    pub async fn get_available_tasks(&self, change_id: &ObjectId) -> Result<AvailableTasks> {
        let (key, graph) = self.task_graph(change_id).await?;

        let tasks: Vec<TaskSummary> = graph
            .available()
            .into_iter()
            .map(TaskSummary::from)
            .collect();
        let message = if graph.is_truncated() {
            "Task graph exceeds traversal.task_graph; raise the budget to list available tasks"
                .to_string()
        } else {
            format!("{} of {} task(s) available", tasks.len(), graph.len())
        };

        Ok(AvailableTasks {
            change_id: key,
            parallel_capacity: tasks.len(),
            truncated: graph.is_truncated(),
            tasks,
            message,
        })
    }

    /// Critical path, progress and parallel capacity of a change.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DependencyCycle`] if the stored `blocks` edges form a
    /// cycle, and propagates store failures.
    pub async fn get_critical_path(&self, change_id: &ObjectId) -> Result<CriticalPathReport> {
        let (key, graph) = self.task_graph(change_id).await?;
        let critical = graph.critical_path()?;
        let progress = graph.progress();
        let parallel_capacity = graph.parallel_capacity();

        let mut message = format!(
            "Critical path: {} task(s), {} point(s). {:.0}% complete, {} task(s) can start now.",
            critical.path.len(),
            critical.cost,
            progress.percent_complete,
            parallel_capacity
        );
        if graph.is_truncated() {
            message.push_str(" Task graph was truncated; results are partial.");
        }

        Ok(CriticalPathReport {
            change_id: key,
            path: critical.path,
            cost: critical.cost,
            progress,
            parallel_capacity,
            truncated: graph.is_truncated(),
            message,
        })
    }

    /// Assign a pending task to an agent and start it.
    ///
    /// Only a stored status of exactly `pending` is assignable.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedType`] if either ID names the wrong entity type
    /// - [`Error::InvalidTransition`] / [`Error::AlreadyInState`] unless the
    ///   task is pending
    /// - store failures
    pub async fn assign_task(
        &self,
        task_id: &ObjectId,
        agent_id: &ObjectId,
    ) -> Result<AssignedTask> {
        let object = self.fetch(task_id, EntityType::Task).await?;
        let task = TaskRecord::from_object(&object);
        let Some(status) = task.status else {
            return Err(Error::InvalidTransition {
                from: object
                    .str_property(props::STATUS)
                    .unwrap_or("unset")
                    .to_string(),
                to: TaskStatus::InProgress.as_str().to_string(),
            });
        };
        validate_task_transition(task.id(), status, TaskStatus::InProgress)?;

        let agent: GraphObject = self.fetch(agent_id, EntityType::Agent).await?;
        let agent_key = EntityIdentity::of(&agent).key;

        self.store
            .create_relationship(
                RelType::AssignedTo.as_str(),
                task.id(),
                &agent_key,
                Properties::new(),
            )
            .await?;

        let started_at = Utc::now();
        let mut properties = Properties::new();
        properties.insert(props::STATUS.to_string(), json!(TaskStatus::InProgress.as_str()));
        properties.insert(props::STARTED_AT.to_string(), json!(started_at.to_rfc3339()));
        self.store.update_object(task.id(), properties).await?;

        info!(task_id = %task.id(), agent_id = %agent_key, number = %task.number, "Assigned task");

        Ok(AssignedTask {
            message: format!("Assigned task {} to agent", task.number),
            task_id: task.identity.key,
            agent_id: agent_key,
            number: task.number,
            status: TaskStatus::InProgress,
            started_at,
        })
    }

    /// Complete a task and report the tasks it unblocked.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyInState`] if the task is already completed
    /// - store failures, including the follow-up traversal
    pub async fn complete_task(
        &self,
        task_id: &ObjectId,
        completion: TaskCompletion,
    ) -> Result<CompletedTask> {
        let task = TaskRecord::from_object(&self.fetch(task_id, EntityType::Task).await?);
        if task.is_completed() {
            return Err(Error::AlreadyInState {
                id: task.id().clone(),
                status: TaskStatus::Completed.as_str().to_string(),
            });
        }

        let completed_at = Utc::now();
        let actual_hours = task.started_at.map(|start| hours_between(start, completed_at));

        let mut properties = Properties::new();
        properties.insert(props::STATUS.to_string(), json!(TaskStatus::Completed.as_str()));
        properties.insert(props::COMPLETED_AT.to_string(), json!(completed_at.to_rfc3339()));
        if let Some(hours) = actual_hours {
            properties.insert(props::ACTUAL_HOURS.to_string(), json!(hours));
        }
        if !completion.artifacts.is_empty() {
            properties.insert(props::ARTIFACTS.to_string(), json!(completion.artifacts));
        }
        if let Some(notes) = completion.verification_notes {
            properties.insert(props::VERIFICATION_NOTES.to_string(), json!(notes));
        }
        self.store.update_object(task.id(), properties).await?;

        let request = self.config().traversal.completion_cascade.request(
            task.id(),
            Direction::Both,
            &[RelType::Blocks],
        );
        let snapshot = Snapshot::from_response(self.store.expand(&request).await?);
        let graph = TaskGraph::from_snapshot(&snapshot);
        let unblocked: Vec<TaskSummary> = graph
            .newly_unblocked_by(task.id())
            .into_iter()
            .map(TaskSummary::from)
            .collect();

        info!(
            task_id = %task.id(),
            number = %task.number,
            unblocked = unblocked.len(),
            "Completed task"
        );

        let message = if graph.is_truncated() {
            format!(
                "Completed task {}. Unblocked tasks unknown: traversal.completion_cascade \
                 was exceeded.",
                task.number
            )
        } else {
            format!(
                "Completed task {}. {} task(s) unblocked.",
                task.number,
                unblocked.len()
            )
        };

        Ok(CompletedTask {
            message,
            truncated: graph.is_truncated(),
            task_id: task.identity.key,
            number: task.number,
            completed_at,
            actual_hours,
            unblocked,
        })
    }
}
