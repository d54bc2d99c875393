//! Task dependency analysis.
//!
//! Tasks of a change form a directed graph of `blocks` edges (A -> B means B
//! cannot start until A is completed). [`TaskGraph`] builds that graph from a
//! canonicalized [`Snapshot`](crate::snapshot::Snapshot) and answers:
//!
//! - which tasks are available to pick up now
//! - how many tasks could run in parallel
//! - which tasks a completion unblocks
//! - the critical path (highest-weight chain of blockers)
//!
//! # Conservative reads
//!
//! A blocker that the traversal referenced but did not return is kept as an
//! unresolved blocker and always counts as incomplete. A task is never
//! reported available or unblocked on the strength of missing data.

mod critical_path;
mod graph;

pub use critical_path::CriticalPath;
pub use graph::{Blocker, TaskGraph};

use crate::domain::{GraphObject, ObjectId, TaskStatus, props};
use crate::identity::EntityIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A task as read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Stable key and current version
    pub identity: EntityIdentity,
    /// Hierarchical number such as "1.2"
    pub number: String,
    /// What the task is about
    pub description: String,
    /// Free-form category
    pub task_type: Option<String>,
    /// `None` when the stored status is missing or unrecognized
    pub status: Option<TaskStatus>,
    /// Weight on the critical path
    pub complexity_points: u32,
    /// When work started
    pub started_at: Option<DateTime<Utc>>,
    /// Task tags
    pub tags: Vec<String>,
}

impl TaskRecord {
    /// Read a task from a fetched object.
    ///
    /// Malformed optional fields read as absent; a malformed weight reads as 0.
    pub fn from_object(object: &GraphObject) -> Self {
        let complexity_points = object
            .properties
            .get(props::COMPLEXITY_POINTS)
            .and_then(serde_json::Value::as_u64)
            .and_then(|points| u32::try_from(points).ok())
            .unwrap_or(0);

        let started_at = object
            .str_property(props::STARTED_AT)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc));

        let tags = object
            .properties
            .get(props::TAGS)
            .and_then(serde_json::Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(serde_json::Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            identity: EntityIdentity::of(object),
            number: object.str_property(props::NUMBER).unwrap_or_default().to_string(),
            description: object
                .str_property(props::DESCRIPTION)
                .unwrap_or_default()
                .to_string(),
            task_type: object.str_property(props::TASK_TYPE).map(str::to_string),
            status: TaskStatus::of(object),
            complexity_points,
            started_at,
            tags,
        }
    }

    /// Primary ID.
    pub fn id(&self) -> &ObjectId {
        &self.identity.key
    }

    /// True if the status is `completed`.
    pub fn is_completed(&self) -> bool {
        self.status == Some(TaskStatus::Completed)
    }
}

/// Compact task view used in reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    /// Primary (canonical) ID
    pub id: ObjectId,
    /// Version-specific ID at fetch time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<ObjectId>,
    /// Task number
    pub number: String,
    /// Task description
    pub description: String,
    /// Task status, if readable
    pub status: Option<TaskStatus>,
    /// Task weight
    pub complexity_points: u32,
}

impl From<&TaskRecord> for TaskSummary {
    fn from(task: &TaskRecord) -> Self {
        Self {
            id: task.identity.key.clone(),
            version_id: task.identity.version.clone(),
            number: task.number.clone(),
            description: task.description.clone(),
            status: task.status,
            complexity_points: task.complexity_points,
        }
    }
}

/// Task counts by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Pending
    pub pending: usize,
    /// In progress
    pub in_progress: usize,
    /// Completed
    pub completed: usize,
    /// Blocked
    pub blocked: usize,
    /// Missing or unrecognized status
    pub unknown: usize,
}

/// Points-based progress of a change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Number of tasks
    pub total_tasks: usize,
    /// Sum of all weights
    pub total_points: u64,
    /// Sum of completed weights
    pub completed_points: u64,
    /// `total_points - completed_points`
    pub remaining_points: u64,
    /// Completed share of points, 0 to 100
    pub percent_complete: f64,
    /// Tasks per status
    pub by_status: StatusCounts,
}

impl Progress {
    /// Tally progress over a set of tasks.
    pub fn of<'a>(tasks: impl IntoIterator<Item = &'a TaskRecord>) -> Self {
        let mut progress = Self::default();

        for task in tasks {
            let points = u64::from(task.complexity_points);
            progress.total_tasks += 1;
            progress.total_points += points;

            match task.status {
                Some(TaskStatus::Completed) => {
                    progress.completed_points += points;
                    progress.by_status.completed += 1;
                }
                Some(TaskStatus::InProgress) => progress.by_status.in_progress += 1,
                Some(TaskStatus::Blocked) => progress.by_status.blocked += 1,
                Some(TaskStatus::Pending) => progress.by_status.pending += 1,
                None => progress.by_status.unknown += 1,
            }
        }

        progress.remaining_points = progress.total_points - progress.completed_points;
        progress.percent_complete = percent(progress.completed_points, progress.total_points);
        progress
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Order task numbers segment by segment, numerically where possible,
/// so "1.2" sorts before "1.10".
pub fn compare_task_numbers(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}
