//! The `blocks` graph over a change's tasks.

use super::{Progress, TaskRecord, compare_task_numbers};
use crate::domain::{EntityType, ObjectId, RelType, TaskStatus};
use crate::snapshot::Snapshot;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Something standing between a task and availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocker<'a> {
    /// A task present in the graph
    Task(&'a TaskRecord),
    /// A blocker the traversal referenced but did not return
    Unresolved(&'a ObjectId),
}

impl Blocker<'_> {
    /// True if this blocker no longer holds anything up.
    ///
    /// Unresolved blockers are never considered cleared.
    pub fn is_cleared(&self) -> bool {
        match self {
            Blocker::Task(task) => task.is_completed(),
            Blocker::Unresolved(_) => false,
        }
    }
}

/// Directed `blocks` graph: an edge A -> B means A blocks B.
///
/// Tasks live in an arena (`tasks`) whose slot `i` is graph node `i`. Lookups
/// accept either identity variant.
///
/// A graph built from a truncated traversal may be missing `blocks` or
/// `assigned_to` edges, so it reports no task as available or unblocked.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: Vec<TaskRecord>,
    graph: DiGraph<usize, ()>,
    slots: HashMap<ObjectId, usize>,
    unresolved_blockers: Vec<Vec<ObjectId>>,
    assigned: Vec<bool>,
    truncated: bool,
}

impl TaskGraph {
    /// Create a graph with the given tasks and no edges.
    ///
    /// Tasks are ordered by number, then by ID. Duplicate entities keep their
    /// first occurrence.
    pub fn new(mut tasks: Vec<TaskRecord>) -> Self {
        tasks.sort_by(|a, b| {
            compare_task_numbers(&a.number, &b.number).then_with(|| a.id().cmp(b.id()))
        });

        let mut graph = Self::default();
        for task in tasks {
            if task.identity.variants().any(|id| graph.slots.contains_key(id)) {
                continue;
            }
            let slot = graph.tasks.len();
            for id in task.identity.variants() {
                graph.slots.insert(id.clone(), slot);
            }
            graph.graph.add_node(slot);
            graph.tasks.push(task);
            graph.unresolved_blockers.push(Vec::new());
            graph.assigned.push(false);
        }
        graph
    }

    /// Build the task graph of one change from a traversal over `has_task`,
    /// `blocks` and `assigned_to`.
    pub fn for_change(snapshot: &Snapshot, change_id: &ObjectId) -> Self {
        let tasks = snapshot
            .targets(change_id, RelType::HasTask)
            .into_iter()
            .filter_map(|id| snapshot.object(id))
            .filter(|object| EntityType::Task.matches(object))
            .map(TaskRecord::from_object)
            .collect();

        Self::with_snapshot_edges(tasks, snapshot)
    }

    /// Build a graph over every task node in a traversal.
    ///
    /// Used around a single task, where there is no change root to start from.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let tasks = snapshot
            .objects_of_type(EntityType::Task)
            .map(TaskRecord::from_object)
            .collect();

        Self::with_snapshot_edges(tasks, snapshot)
    }

    fn with_snapshot_edges(tasks: Vec<TaskRecord>, snapshot: &Snapshot) -> Self {
        let mut graph = Self::new(tasks);
        if snapshot.is_truncated() {
            warn!(
                tasks = graph.tasks.len(),
                "Task traversal was truncated; no task will be reported available"
            );
            graph.mark_truncated();
        }

        for edge in snapshot.edges() {
            if edge.rel_type == RelType::Blocks.as_str() {
                graph.add_blocks(&edge.src_id, &edge.dst_id);
            } else if edge.rel_type == RelType::AssignedTo.as_str() {
                graph.mark_assigned(&edge.src_id);
            }
        }

        debug!(
            tasks = graph.tasks.len(),
            edges = graph.graph.edge_count(),
            "Built task graph"
        );
        graph
    }

    /// Record that `blocker` blocks `blocked`.
    ///
    /// Edges into unknown tasks are ignored. Edges from unknown tasks are kept
    /// as unresolved blockers. Repeated edges are stored once.
    pub fn add_blocks(&mut self, blocker: &ObjectId, blocked: &ObjectId) {
        let Some(&blocked_slot) = self.slots.get(blocked) else {
            return;
        };

        match self.slots.get(blocker) {
            Some(&blocker_slot) => {
                self.graph
                    .update_edge(NodeIndex::new(blocker_slot), NodeIndex::new(blocked_slot), ());
            }
            None => {
                let unresolved = &mut self.unresolved_blockers[blocked_slot];
                if !unresolved.contains(blocker) {
                    unresolved.push(blocker.clone());
                }
            }
        }
    }

    /// Record that a task has an `assigned_to` edge.
    pub fn mark_assigned(&mut self, task: &ObjectId) {
        if let Some(&slot) = self.slots.get(task) {
            self.assigned[slot] = true;
        }
    }

    /// Record that edges may be missing from this graph.
    pub fn mark_truncated(&mut self) {
        self.truncated = true;
    }

    /// True if the graph was built from a truncated traversal.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Tasks in graph order.
    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when the graph has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task named by either identity variant.
    pub fn task(&self, id: &ObjectId) -> Option<&TaskRecord> {
        self.slots.get(id).map(|&slot| &self.tasks[slot])
    }

    /// True if the task has an `assigned_to` edge.
    pub fn is_assigned(&self, id: &ObjectId) -> bool {
        self.slots.get(id).is_some_and(|&slot| self.assigned[slot])
    }

    /// Slots of the tasks directly blocked by `slot`, in edge insertion order.
    pub(super) fn successors(&self, slot: usize) -> Vec<usize> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(NodeIndex::new(slot), Direction::Outgoing)
            .map(|edge| (edge.id(), edge.target().index()))
            .collect();
        edges.sort_unstable_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    fn blockers_of(&self, slot: usize) -> Vec<Blocker<'_>> {
        let mut blockers: Vec<(usize, Blocker<'_>)> = self
            .graph
            .edges_directed(NodeIndex::new(slot), Direction::Incoming)
            .map(|edge| (edge.id().index(), Blocker::Task(&self.tasks[edge.source().index()])))
            .collect();
        blockers.sort_unstable_by_key(|(id, _)| *id);

        blockers
            .into_iter()
            .map(|(_, blocker)| blocker)
            .chain(self.unresolved_blockers[slot].iter().map(Blocker::Unresolved))
            .collect()
    }

    /// Everything blocking a task, resolved blockers first.
    pub fn blockers(&self, id: &ObjectId) -> Vec<Blocker<'_>> {
        self.slots
            .get(id)
            .map(|&slot| self.blockers_of(slot))
            .unwrap_or_default()
    }

    fn is_available_slot(&self, slot: usize) -> bool {
        !self.truncated
            && self.tasks[slot].status == Some(TaskStatus::Pending)
            && !self.assigned[slot]
            && self.blockers_of(slot).iter().all(Blocker::is_cleared)
    }

    /// Pending, unassigned, and every blocker completed.
    ///
    /// Always false on a truncated graph.
    pub fn is_available(&self, id: &ObjectId) -> bool {
        self.slots
            .get(id)
            .is_some_and(|&slot| self.is_available_slot(slot))
    }

    /// Tasks that can be picked up now, in task-number order.
    pub fn available(&self) -> Vec<&TaskRecord> {
        (0..self.tasks.len())
            .filter(|&slot| self.is_available_slot(slot))
            .map(|slot| &self.tasks[slot])
            .collect()
    }

    /// How many tasks could be worked on concurrently right now.
    pub fn parallel_capacity(&self) -> usize {
        (0..self.tasks.len())
            .filter(|&slot| self.is_available_slot(slot))
            .count()
    }

    /// Tasks directly blocked by `completed` whose every other blocker is
    /// completed.
    ///
    /// `completed` counts as done regardless of the status in the snapshot.
    /// Successors that are themselves already completed are not reported, and
    /// nothing is reported from a truncated graph.
    pub fn newly_unblocked_by(&self, completed: &ObjectId) -> Vec<&TaskRecord> {
        if self.truncated {
            return Vec::new();
        }
        let Some(&completed_slot) = self.slots.get(completed) else {
            return Vec::new();
        };

        self.successors(completed_slot)
            .into_iter()
            .filter(|&slot| !self.tasks[slot].is_completed())
            .filter(|&slot| {
                self.blockers_of(slot).iter().all(|blocker| match blocker {
                    Blocker::Task(task) if task.id() == self.tasks[completed_slot].id() => true,
                    other => other.is_cleared(),
                })
            })
            .map(|slot| &self.tasks[slot])
            .collect()
    }

    /// Progress over every task in the graph.
    pub fn progress(&self) -> Progress {
        Progress::of(&self.tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GraphObject, Properties};
    use crate::snapshot::fixtures::{ResponseBuilder, canonical, version};
    use serde_json::json;

    fn task(name: &str, number: &str, status: &str, points: u32) -> GraphObject {
        let mut properties = Properties::new();
        properties.insert("number".to_string(), json!(number));
        properties.insert("status".to_string(), json!(status));
        properties.insert("complexity_points".to_string(), json!(points));
        GraphObject {
            id: version(name),
            canonical_id: canonical(name),
            object_type: "Task".to_string(),
            properties,
            labels: vec![],
        }
    }

    fn names(tasks: &[&TaskRecord]) -> Vec<String> {
        tasks.iter().map(|t| t.number.clone()).collect()
    }

    /// Ten tasks: three completed, two pending behind an incomplete blocker,
    /// two pending but assigned, three pending and free.
    fn ten_tasks() -> Snapshot {
        let mut builder = ResponseBuilder::default()
            .node("change", EntityType::Change, None)
            .node("agent", EntityType::Agent, None);

        let specs = [
            ("t1", "1", "completed"),
            ("t2", "2", "completed"),
            ("t3", "3", "completed"),
            ("t4", "4", "pending"),
            ("t5", "5", "pending"),
            ("t6", "6", "pending"),
            ("t7", "7", "pending"),
            ("t8", "8", "pending"),
            ("t9", "9", "pending"),
            ("t10", "10", "in_progress"),
        ];
        for (name, number, status) in specs {
            builder = builder
                .object(task(name, number, status, 1))
                .edge(RelType::HasTask, "change", name);
        }

        builder
            // t4 and t5 wait on t10, which is still in progress
            .edge(RelType::Blocks, "t10", "t4")
            .edge_with(RelType::Blocks, "t10", false, "t5", true)
            // t6 and t7 are assigned
            .edge(RelType::AssignedTo, "t6", "agent")
            .edge_with(RelType::AssignedTo, "t7", false, "agent", false)
            // t8 waits only on completed work
            .edge(RelType::Blocks, "t1", "t8")
            .edge(RelType::Blocks, "t2", "t8")
            .snapshot()
    }

    #[test]
    fn test_availability_over_ten_tasks() {
        let graph = TaskGraph::for_change(&ten_tasks(), &canonical("change"));

        assert_eq!(graph.len(), 10);
        assert_eq!(names(&graph.available()), vec!["8", "9"]);
        assert_eq!(graph.parallel_capacity(), 2);
        assert!(graph.is_assigned(&version("t6")));
        assert!(!graph.is_available(&canonical("t4")));
    }

    #[test]
    fn test_availability_with_external_blocker() {
        // Three completed, two pending behind an incomplete blocker, two
        // pending but assigned, three pending, unblocked and unassigned.
        let mut builder = ResponseBuilder::default()
            .node("change", EntityType::Change, None)
            .node("agent", EntityType::Agent, None)
            .node("blocker", EntityType::Task, Some("blocked"));
        let statuses = [
            "completed", "completed", "completed", "pending", "pending", "pending", "pending",
            "pending", "pending", "pending",
        ];
        for (i, status) in statuses.iter().enumerate() {
            let name = format!("t{}", i + 1);
            builder = builder
                .object(task(&name, &(i + 1).to_string(), status, 1))
                .edge(RelType::HasTask, "change", &name);
        }
        let snapshot = builder
            .edge(RelType::Blocks, "blocker", "t4")
            .edge(RelType::Blocks, "blocker", "t5")
            .edge(RelType::AssignedTo, "t6", "agent")
            .edge(RelType::AssignedTo, "t7", "agent")
            .snapshot();

        let graph = TaskGraph::for_change(&snapshot, &canonical("change"));

        // The blocker is not linked to the change, so it resolves to nothing
        // and keeps t4 and t5 blocked.
        assert_eq!(graph.len(), 10);
        assert_eq!(names(&graph.available()), vec!["8", "9", "10"]);
    }

    #[test]
    fn test_unresolved_blocker_keeps_task_blocked() {
        let snapshot = ResponseBuilder::default()
            .node("change", EntityType::Change, None)
            .object(task("t1", "1", "pending", 1))
            .edge(RelType::HasTask, "change", "t1")
            .edge(RelType::Blocks, "ghost", "t1")
            .snapshot();

        let graph = TaskGraph::for_change(&snapshot, &canonical("change"));

        assert!(graph.available().is_empty());
        assert!(matches!(
            graph.blockers(&canonical("t1"))[..],
            [Blocker::Unresolved(_)]
        ));
    }

    #[test]
    fn test_available_sorted_by_number() {
        let snapshot = ResponseBuilder::default()
            .node("change", EntityType::Change, None)
            .object(task("a", "1.10", "pending", 1))
            .object(task("b", "1.2", "pending", 1))
            .object(task("c", "1", "pending", 1))
            .edge(RelType::HasTask, "change", "a")
            .edge(RelType::HasTask, "change", "b")
            .edge(RelType::HasTask, "change", "c")
            .snapshot();

        let graph = TaskGraph::for_change(&snapshot, &canonical("change"));

        assert_eq!(names(&graph.available()), vec!["1", "1.2", "1.10"]);
    }

    #[test]
    fn test_completion_unblocks_sole_dependent() {
        let snapshot = ResponseBuilder::default()
            .object(task("a", "1", "completed", 1))
            .object(task("b", "2", "pending", 1))
            .edge(RelType::Blocks, "a", "b")
            .snapshot();

        let graph = TaskGraph::from_snapshot(&snapshot);
        let unblocked = graph.newly_unblocked_by(&version("a"));

        assert_eq!(names(&unblocked), vec!["2"]);
    }

    #[test]
    fn test_completion_with_other_incomplete_blocker() {
        let snapshot = ResponseBuilder::default()
            .object(task("a", "1", "completed", 1))
            .object(task("c", "3", "in_progress", 1))
            .object(task("b", "2", "pending", 1))
            .edge(RelType::Blocks, "a", "b")
            .edge(RelType::Blocks, "c", "b")
            .snapshot();

        let graph = TaskGraph::from_snapshot(&snapshot);

        assert!(graph.newly_unblocked_by(&canonical("a")).is_empty());
    }

    #[test]
    fn test_completion_with_missing_other_blocker() {
        let snapshot = ResponseBuilder::default()
            .object(task("a", "1", "completed", 1))
            .object(task("b", "2", "pending", 1))
            .edge(RelType::Blocks, "a", "b")
            .edge(RelType::Blocks, "cut-off", "b")
            .snapshot();

        let graph = TaskGraph::from_snapshot(&snapshot);

        assert!(graph.newly_unblocked_by(&canonical("a")).is_empty());
    }

    #[test]
    fn test_completion_treats_completed_task_as_done() {
        // The snapshot may predate the status write.
        let snapshot = ResponseBuilder::default()
            .object(task("a", "1", "in_progress", 1))
            .object(task("b", "2", "pending", 1))
            .edge(RelType::Blocks, "a", "b")
            .snapshot();

        let graph = TaskGraph::from_snapshot(&snapshot);

        assert_eq!(graph.newly_unblocked_by(&canonical("a")).len(), 1);
    }

    #[test]
    fn test_completion_skips_already_completed_dependents() {
        let snapshot = ResponseBuilder::default()
            .object(task("a", "1", "completed", 1))
            .object(task("b", "2", "completed", 1))
            .edge(RelType::Blocks, "a", "b")
            .snapshot();

        let graph = TaskGraph::from_snapshot(&snapshot);

        assert!(graph.newly_unblocked_by(&canonical("a")).is_empty());
    }

    #[test]
    fn test_truncated_graph_reports_nothing_available() {
        // The blocks edge from the in-progress task was cut by the budget.
        let mut response = ResponseBuilder::default()
            .node("change", EntityType::Change, None)
            .object(task("a", "1", "in_progress", 1))
            .object(task("b", "2", "pending", 1))
            .edge(RelType::HasTask, "change", "a")
            .edge(RelType::HasTask, "change", "b")
            .build();
        response.truncated = true;
        let snapshot = Snapshot::from_response(response);
        let graph = TaskGraph::for_change(&snapshot, &canonical("change"));

        assert!(graph.is_truncated());
        assert_eq!(graph.len(), 2);
        assert!(graph.available().is_empty());
        assert_eq!(graph.parallel_capacity(), 0);
        assert!(!graph.is_available(&canonical("b")));
    }

    #[test]
    fn test_truncated_graph_reports_nothing_unblocked() {
        let mut response = ResponseBuilder::default()
            .object(task("a", "1", "completed", 1))
            .object(task("b", "2", "pending", 1))
            .edge(RelType::Blocks, "a", "b")
            .build();
        response.truncated = true;
        let graph = TaskGraph::from_snapshot(&Snapshot::from_response(response));

        assert!(graph.newly_unblocked_by(&canonical("a")).is_empty());
    }

    #[test]
    fn test_missing_status_is_never_available() {
        let mut unset = task("a", "1", "pending", 1);
        unset.properties.remove("status");
        let snapshot = ResponseBuilder::default().object(unset).snapshot();

        let graph = TaskGraph::from_snapshot(&snapshot);

        assert_eq!(graph.len(), 1);
        assert!(graph.available().is_empty());
        assert_eq!(graph.progress().by_status.unknown, 1);
    }

    #[test]
    fn test_duplicate_blocks_edges_collapse() {
        let snapshot = ResponseBuilder::default()
            .object(task("a", "1", "pending", 1))
            .object(task("b", "2", "pending", 1))
            .edge_with(RelType::Blocks, "a", true, "b", true)
            .edge_with(RelType::Blocks, "a", false, "b", false)
            .snapshot();

        let graph = TaskGraph::from_snapshot(&snapshot);

        assert_eq!(graph.blockers(&canonical("b")).len(), 1);
    }
}
