//! Longest weighted chain through the `blocks` graph.

use super::{TaskGraph, TaskSummary};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The highest-weight chain of tasks, first blocker first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalPath {
    /// Tasks on the path
    pub path: Vec<TaskSummary>,
    /// Sum of complexity points along the path
    pub cost: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

impl TaskGraph {
    /// Compute the critical path.
    ///
    /// `longest(t)` is the weight of `t` plus the largest `longest` among the
    /// tasks it blocks. The path starts at the first task (in graph order)
    /// with the largest `longest` and follows, at each step, the successor
    /// with the largest `longest`, preferring the edge added first on ties.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DependencyCycle`] if the `blocks` edges form a cycle.
    pub fn critical_path(&self) -> Result<CriticalPath> {
        let successors: Vec<Vec<usize>> =
            (0..self.len()).map(|slot| self.successors(slot)).collect();
        let longest = self.longest_from_each(&successors)?;

        let Some(start) = first_max(0..self.len(), &longest) else {
            return Ok(CriticalPath::default());
        };

        let mut path = vec![start];
        let mut current = start;
        while let Some(next) = first_max(successors[current].iter().copied(), &longest) {
            path.push(next);
            current = next;
        }

        let tasks = self.tasks();
        let critical = CriticalPath {
            path: path.iter().map(|&slot| TaskSummary::from(&tasks[slot])).collect(),
            cost: longest[start],
        };

        debug!(
            length = critical.path.len(),
            cost = critical.cost,
            "Computed critical path"
        );
        Ok(critical)
    }

    /// Memoized longest-chain weight from every task, iteratively so deep
    /// chains do not grow the call stack.
    fn longest_from_each(&self, successors: &[Vec<usize>]) -> Result<Vec<u64>> {
        let tasks = self.tasks();
        let mut marks = vec![Mark::Unvisited; tasks.len()];
        let mut longest = vec![0_u64; tasks.len()];

        for root in 0..tasks.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }

            // (slot, index of the next successor to visit)
            let mut stack = vec![(root, 0_usize)];
            marks[root] = Mark::Visiting;

            while let Some(frame) = stack.last_mut() {
                let slot = frame.0;
                if let Some(&next) = successors[slot].get(frame.1) {
                    frame.1 += 1;
                    match marks[next] {
                        Mark::Done => {}
                        Mark::Unvisited => {
                            marks[next] = Mark::Visiting;
                            stack.push((next, 0));
                        }
                        Mark::Visiting => {
                            let from = stack.iter().position(|&(s, _)| s == next).unwrap_or(0);
                            let task_ids: Vec<String> = stack[from..]
                                .iter()
                                .chain(std::iter::once(&(next, 0)))
                                .map(|&(s, _)| tasks[s].id().to_string())
                                .collect();
                            warn!(cycle = ?task_ids, "Cycle in task dependencies");
                            return Err(Error::DependencyCycle { task_ids });
                        }
                    }
                } else {
                    let downstream = successors[slot]
                        .iter()
                        .map(|&s| longest[s])
                        .max()
                        .unwrap_or(0);
                    longest[slot] = u64::from(tasks[slot].complexity_points) + downstream;
                    marks[slot] = Mark::Done;
                    stack.pop();
                }
            }
        }

        Ok(longest)
    }
}

/// First slot with the largest value; later equal values do not replace it.
fn first_max(slots: impl Iterator<Item = usize>, values: &[u64]) -> Option<usize> {
    slots.fold(None, |best, slot| match best {
        Some(best) if values[best] >= values[slot] => Some(best),
        _ => Some(slot),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ObjectId, TaskStatus};
    use crate::identity::EntityIdentity;
    use crate::tasks::TaskRecord;
    use proptest::prelude::*;

    fn task(name: &str, points: u32) -> TaskRecord {
        TaskRecord {
            identity: EntityIdentity {
                key: ObjectId::new(format!("c-{name}")),
                version: Some(ObjectId::new(format!("v-{name}"))),
            },
            number: name.trim_start_matches('t').to_string(),
            description: String::new(),
            task_type: None,
            status: Some(TaskStatus::Pending),
            complexity_points: points,
            started_at: None,
            tags: vec![],
        }
    }

    fn id(name: &str) -> ObjectId {
        ObjectId::new(format!("c-{name}"))
    }

    fn numbers(critical: &CriticalPath) -> Vec<&str> {
        critical.path.iter().map(|t| t.number.as_str()).collect()
    }

    #[test]
    fn test_chain() {
        let mut graph = TaskGraph::new(vec![task("t1", 2), task("t2", 3), task("t3", 5)]);
        graph.add_blocks(&id("t1"), &id("t2"));
        graph.add_blocks(&ObjectId::new("v-t2"), &id("t3"));

        let critical = graph.critical_path().unwrap();

        assert_eq!(critical.cost, 10);
        assert_eq!(numbers(&critical), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_heavier_branch_wins() {
        let mut graph = TaskGraph::new(vec![
            task("t1", 1),
            task("t2", 1),
            task("t3", 8),
            task("t4", 1),
        ]);
        graph.add_blocks(&id("t1"), &id("t2"));
        graph.add_blocks(&id("t1"), &id("t3"));
        graph.add_blocks(&id("t2"), &id("t4"));
        graph.add_blocks(&id("t3"), &id("t4"));

        let critical = graph.critical_path().unwrap();

        assert_eq!(critical.cost, 10);
        assert_eq!(numbers(&critical), vec!["1", "3", "4"]);
    }

    #[test]
    fn test_ties_follow_first_edge() {
        let mut graph = TaskGraph::new(vec![task("t1", 1), task("t2", 2), task("t3", 2)]);
        graph.add_blocks(&id("t1"), &id("t3"));
        graph.add_blocks(&id("t1"), &id("t2"));

        let critical = graph.critical_path().unwrap();

        assert_eq!(critical.cost, 3);
        assert_eq!(numbers(&critical), vec!["1", "3"]);
    }

    #[test]
    fn test_disconnected_tasks_pick_heaviest() {
        let graph = TaskGraph::new(vec![task("t1", 2), task("t2", 7), task("t3", 7)]);

        let critical = graph.critical_path().unwrap();

        assert_eq!(critical.cost, 7);
        assert_eq!(numbers(&critical), vec!["2"]);
    }

    #[test]
    fn test_zero_weight_tasks_still_form_a_path() {
        let mut graph = TaskGraph::new(vec![task("t1", 0), task("t2", 0)]);
        graph.add_blocks(&id("t1"), &id("t2"));

        let critical = graph.critical_path().unwrap();

        assert_eq!(critical.cost, 0);
        assert_eq!(numbers(&critical), vec!["1", "2"]);
    }

    #[test]
    fn test_empty_graph() {
        let critical = TaskGraph::default().critical_path().unwrap();
        assert!(critical.path.is_empty());
        assert_eq!(critical.cost, 0);
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut graph =
            TaskGraph::new(vec![task("t1", 1), task("t2", 1), task("t3", 1), task("t4", 1)]);
        graph.add_blocks(&id("t1"), &id("t2"));
        graph.add_blocks(&id("t2"), &id("t3"));
        graph.add_blocks(&id("t3"), &id("t4"));
        graph.add_blocks(&id("t4"), &id("t2"));

        let err = graph.critical_path().unwrap_err();

        match err {
            Error::DependencyCycle { task_ids } => {
                assert_eq!(task_ids, vec!["c-t2", "c-t3", "c-t4", "c-t2"]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_block_is_a_cycle() {
        let mut graph = TaskGraph::new(vec![task("t1", 1)]);
        graph.add_blocks(&id("t1"), &id("t1"));

        assert!(matches!(
            graph.critical_path(),
            Err(Error::DependencyCycle { .. })
        ));
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        let tasks: Vec<_> = (0..5_000).map(|i| task(&format!("t{i}"), 1)).collect();
        let mut graph = TaskGraph::new(tasks);
        for i in 0..4_999 {
            graph.add_blocks(&id(&format!("t{i}")), &id(&format!("t{}", i + 1)));
        }

        let critical = graph.critical_path().unwrap();

        assert_eq!(critical.cost, 5_000);
        assert_eq!(critical.path.len(), 5_000);
    }

    proptest! {
        /// Random DAGs: the path is a real chain and its weight is the cost.
        #[test]
        fn prop_path_weight_is_cost(
            weights in prop::collection::vec(0_u32..10, 1..12),
            raw_edges in prop::collection::vec((0_usize..12, 0_usize..12), 0..30),
        ) {
            let n = weights.len();
            let tasks = weights
                .iter()
                .enumerate()
                .map(|(i, &w)| task(&format!("t{i}"), w))
                .collect();
            let mut graph = TaskGraph::new(tasks);

            // Only low -> high edges, so the graph is acyclic
            let edges: Vec<(usize, usize)> = raw_edges
                .into_iter()
                .map(|(a, b)| (a % n, b % n))
                .filter(|(a, b)| a < b)
                .collect();
            for &(a, b) in &edges {
                graph.add_blocks(&id(&format!("t{a}")), &id(&format!("t{b}")));
            }

            let critical = graph.critical_path().unwrap();

            let weight: u64 = critical.path.iter().map(|t| u64::from(t.complexity_points)).sum();
            prop_assert_eq!(weight, critical.cost);
            let heaviest = weights.iter().copied().map(u64::from).max().unwrap_or(0);
            prop_assert!(critical.cost >= heaviest);

            for pair in critical.path.windows(2) {
                let from = graph.task(&pair[0].id).unwrap();
                let to = &pair[1].id;
                prop_assert!(graph
                    .blockers(to)
                    .iter()
                    .any(|b| matches!(b, crate::tasks::Blocker::Task(t) if t.id() == from.id())));
            }
        }
    }
}
