use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use tracing::{debug, warn};

use crate::task::types::*;

/// Dependency graph over one project's task snapshot.
///
/// Tasks are indexed by id; edges point from a task to the tasks it depends on, and the
/// reverse index records who depends on whom. Edges to ids outside the snapshot are kept
/// out of both indexes and surface through [`validate_referential_integrity`].
///
/// [`validate_referential_integrity`]: DependencyGraph::validate_referential_integrity
#[derive(Debug, Clone)]
pub struct DependencyGraph<'a> {
    tasks: HashMap<TaskId, &'a Task>,
    /// Input order, used wherever iteration order is observable
    order: Vec<TaskId>,
    dependents: HashMap<TaskId, Vec<TaskId>>,
    children: HashMap<TaskId, Vec<TaskId>>,
}

/// DFS bookkeeping for cycle detection
struct CycleWalk<'w> {
    unmet_only: bool,
    visited: &'w mut HashSet<TaskId>,
    on_stack: &'w mut HashSet<TaskId>,
    path: &'w mut Vec<TaskId>,
    cycles: &'w mut Vec<DependencyCycle>,
}

/// Closed loop of dependency edges, listed in traversal order
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DependencyCycle {
    pub task_ids: Vec<TaskId>,
}

/// Problem found by the referential integrity check
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    DanglingDependency { task_id: TaskId, missing: TaskId },
    SelfDependency { task_id: TaskId },
    MissingParent { task_id: TaskId, parent_id: TaskId },
    DepthMismatch { task_id: TaskId, depth: u32, expected: u32 },
}

/// One line of an upstream/downstream chain listing
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChainEntry {
    pub task_id: TaskId,
    pub title: String,
    pub state: TaskState,
    pub level: usize,
    /// Already listed earlier in this chain; its subtree is not expanded again
    pub revisited: bool,
}

/// Direction of a chain listing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainDirection {
    /// What the task waits on
    Upstream,
    /// What waits on the task
    Downstream,
}

/// Aggregate numbers about a project snapshot
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ProjectStatistics {
    pub total_tasks: u32,
    pub pending_tasks: u32,
    pub in_progress_tasks: u32,
    pub blocked_tasks: u32,
    pub completed_tasks: u32,
    pub cancelled_tasks: u32,
    pub deletion_pending_tasks: u32,
    pub dependency_edges: u32,
    pub max_depth: u32,
    pub completion_percentage: f64,
}

impl<'a> DependencyGraph<'a> {
    /// Build the graph for a task snapshot
    pub fn new(tasks: &'a [Task]) -> Self {
        let mut by_id = HashMap::with_capacity(tasks.len());
        let mut order = Vec::with_capacity(tasks.len());
        for task in tasks {
            if by_id.insert(task.id, task).is_none() {
                order.push(task.id);
            } else {
                warn!("Duplicate task id {} in snapshot, keeping the last copy", task.id);
            }
        }

        let mut dependents: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        let mut children: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        for &task_id in &order {
            let task = by_id[&task_id];
            for dep_id in &task.dependencies {
                if by_id.contains_key(dep_id) {
                    let entry = dependents.entry(*dep_id).or_default();
                    if !entry.contains(&task_id) {
                        entry.push(task_id);
                    }
                }
            }
            if let Some(parent_id) = task.parent_id {
                children.entry(parent_id).or_default().push(task_id);
            }
        }

        Self {
            tasks: by_id,
            order,
            dependents,
            children,
        }
    }

    pub fn get(&self, task_id: TaskId) -> Option<&'a Task> {
        self.tasks.get(&task_id).copied()
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        self.tasks.contains_key(&task_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Tasks in snapshot order
    pub fn tasks(&self) -> impl Iterator<Item = &'a Task> + '_ {
        self.order.iter().map(move |id| self.tasks[id])
    }

    /// Dependencies of a task that exist in the snapshot
    fn resolved_dependencies(&self, task_id: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks
            .get(&task_id)
            .into_iter()
            .flat_map(|task| task.dependencies.iter().copied())
            .filter(move |dep_id| self.tasks.contains_key(dep_id))
    }

    /// Tasks whose dependency set contains `task_id`
    pub fn dependents(&self, task_id: TaskId) -> &[TaskId] {
        self.dependents
            .get(&task_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Direct children in the task hierarchy
    pub fn children(&self, task_id: TaskId) -> &[TaskId] {
        self.children.get(&task_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_children(&self, task_id: TaskId) -> bool {
        !self.children(task_id).is_empty()
    }

    /// Every task that directly or indirectly depends on `task_id`, nearest first
    pub fn transitive_dependents(&self, task_id: TaskId) -> Vec<TaskId> {
        self.breadth_first(task_id, |id| self.dependents(id).to_vec())
    }

    /// Every task `task_id` directly or indirectly depends on, nearest first
    pub fn transitive_dependencies(&self, task_id: TaskId) -> Vec<TaskId> {
        self.breadth_first(task_id, |id| self.resolved_dependencies(id).collect())
    }

    fn breadth_first<F>(&self, root: TaskId, next: F) -> Vec<TaskId>
    where
        F: Fn(TaskId) -> Vec<TaskId>,
    {
        let mut visited = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);
        let mut reached = Vec::new();

        while let Some(current) = queue.pop_front() {
            for neighbor in next(current) {
                if visited.insert(neighbor) {
                    reached.push(neighbor);
                    queue.push_back(neighbor);
                }
            }
        }

        reached
    }

    /// True when every dependency resolves to a completed task
    pub fn dependencies_met(&self, task: &Task) -> bool {
        task.dependencies
            .iter()
            .all(|dep_id| self.get(*dep_id).is_some_and(Task::is_completed))
    }

    /// Dependency ids of `task` that are not completed, including ids that match no task
    pub fn unmet_dependencies(&self, task: &Task) -> Vec<TaskId> {
        task.dependencies
            .iter()
            .copied()
            .filter(|dep_id| !self.get(*dep_id).is_some_and(Task::is_completed))
            .collect()
    }

    /// Find every dependency cycle in the snapshot
    pub fn detect_cycles(&self) -> Vec<DependencyCycle> {
        self.detect_cycles_within(&self.order)
    }

    /// Find dependency cycles reachable from the given start nodes
    pub fn detect_cycles_within(&self, roots: &[TaskId]) -> Vec<DependencyCycle> {
        self.search_cycles(roots, false)
    }

    /// Like [`detect_cycles_within`](Self::detect_cycles_within), following only edges to
    /// tasks that are not completed yet
    pub fn detect_unmet_cycles_within(&self, roots: &[TaskId]) -> Vec<DependencyCycle> {
        self.search_cycles(roots, true)
    }

    fn search_cycles(&self, roots: &[TaskId], unmet_only: bool) -> Vec<DependencyCycle> {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        let mut path = Vec::new();
        let mut cycles = Vec::new();

        for &task_id in roots {
            if self.contains(task_id) && !visited.contains(&task_id) {
                let mut walk = CycleWalk {
                    unmet_only,
                    visited: &mut visited,
                    on_stack: &mut on_stack,
                    path: &mut path,
                    cycles: &mut cycles,
                };
                self.cycle_helper(task_id, &mut walk);
            }
        }

        if !cycles.is_empty() {
            debug!("Detected {} dependency cycle(s)", cycles.len());
        }
        cycles
    }

    /// Helper function for cycle detection
    fn cycle_helper(&self, task_id: TaskId, walk: &mut CycleWalk<'_>) {
        walk.visited.insert(task_id);
        walk.on_stack.insert(task_id);
        walk.path.push(task_id);

        for dep_id in self.resolved_dependencies(task_id) {
            if walk.unmet_only && self.get(dep_id).is_some_and(Task::is_completed) {
                continue;
            }
            if walk.on_stack.contains(&dep_id) {
                if let Some(start) = walk.path.iter().position(|id| *id == dep_id) {
                    walk.cycles.push(DependencyCycle {
                        task_ids: walk.path[start..].to_vec(),
                    });
                }
            } else if !walk.visited.contains(&dep_id) {
                self.cycle_helper(dep_id, walk);
            }
        }

        walk.path.pop();
        walk.on_stack.remove(&task_id);
    }

    /// Whether adding the edge `from -> to` (from depends on to) would close a loop
    pub fn would_create_cycle(&self, from: TaskId, to: TaskId) -> bool {
        from == to || self.transitive_dependencies(to).contains(&from)
    }

    /// Report broken references without modifying anything
    pub fn validate_referential_integrity(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        for task in self.tasks() {
            for &dep_id in &task.dependencies {
                if dep_id == task.id {
                    issues.push(IntegrityIssue::SelfDependency { task_id: task.id });
                } else if !self.contains(dep_id) {
                    issues.push(IntegrityIssue::DanglingDependency {
                        task_id: task.id,
                        missing: dep_id,
                    });
                }
            }

            match task.parent_id.map(|id| (id, self.get(id))) {
                Some((parent_id, None)) => issues.push(IntegrityIssue::MissingParent {
                    task_id: task.id,
                    parent_id,
                }),
                Some((_, Some(parent))) if task.depth != parent.depth + 1 => {
                    issues.push(IntegrityIssue::DepthMismatch {
                        task_id: task.id,
                        depth: task.depth,
                        expected: parent.depth + 1,
                    })
                }
                None if task.depth != 0 => issues.push(IntegrityIssue::DepthMismatch {
                    task_id: task.id,
                    depth: task.depth,
                    expected: 0,
                }),
                _ => {}
            }
        }

        issues
    }

    /// Everything the task waits on, indented by distance
    pub fn upstream_chain(&self, task_id: TaskId) -> Vec<ChainEntry> {
        self.chain(task_id, ChainDirection::Upstream)
    }

    /// Everything waiting on the task, indented by distance
    pub fn downstream_chain(&self, task_id: TaskId) -> Vec<ChainEntry> {
        self.chain(task_id, ChainDirection::Downstream)
    }

    pub fn chain(&self, task_id: TaskId, direction: ChainDirection) -> Vec<ChainEntry> {
        let mut entries = Vec::new();
        let mut visited = HashSet::new();
        if self.contains(task_id) {
            self.chain_helper(task_id, direction, 0, &mut visited, &mut entries);
        }
        entries
    }

    // Carries its own visited set; callers may not have run cycle detection
    fn chain_helper(
        &self,
        task_id: TaskId,
        direction: ChainDirection,
        level: usize,
        visited: &mut HashSet<TaskId>,
        entries: &mut Vec<ChainEntry>,
    ) {
        let Some(task) = self.get(task_id) else {
            return;
        };
        let first_visit = visited.insert(task_id);
        entries.push(ChainEntry {
            task_id,
            title: task.title.clone(),
            state: task.state,
            level,
            revisited: !first_visit,
        });
        if !first_visit {
            return;
        }

        let next: Vec<TaskId> = match direction {
            ChainDirection::Upstream => self.resolved_dependencies(task_id).collect(),
            ChainDirection::Downstream => self.dependents(task_id).to_vec(),
        };
        for neighbor in next {
            self.chain_helper(neighbor, direction, level + 1, visited, entries);
        }
    }

    /// Length of the longest chain of unfinished dependents hanging off a task.
    ///
    /// A task nobody waits on scores 0. Edges that close a cycle are not followed.
    pub fn longest_dependent_chain(&self, task_id: TaskId) -> usize {
        let mut memo = HashMap::new();
        let mut on_stack = HashSet::new();
        self.longest_chain_helper(task_id, &mut memo, &mut on_stack)
    }

    fn longest_chain_helper(
        &self,
        task_id: TaskId,
        memo: &mut HashMap<TaskId, usize>,
        on_stack: &mut HashSet<TaskId>,
    ) -> usize {
        if let Some(&length) = memo.get(&task_id) {
            return length;
        }
        on_stack.insert(task_id);

        let mut longest = 0;
        for &dependent_id in self.dependents(task_id) {
            let finished = self.get(dependent_id).is_none_or(Task::is_finished);
            if finished || on_stack.contains(&dependent_id) {
                continue;
            }
            longest = longest.max(1 + self.longest_chain_helper(dependent_id, memo, on_stack));
        }

        on_stack.remove(&task_id);
        memo.insert(task_id, longest);
        longest
    }

    /// Number of dependency edges between tasks of the snapshot
    pub fn edge_count(&self) -> usize {
        self.dependents.values().map(Vec::len).sum()
    }

    /// Rebuild statistics from current task states
    pub fn statistics(&self) -> ProjectStatistics {
        let mut stats = ProjectStatistics {
            total_tasks: self.len() as u32,
            dependency_edges: self.edge_count() as u32,
            ..Default::default()
        };

        for task in self.tasks() {
            match task.state {
                TaskState::Pending => stats.pending_tasks += 1,
                TaskState::InProgress => stats.in_progress_tasks += 1,
                TaskState::Blocked => stats.blocked_tasks += 1,
                TaskState::Completed => stats.completed_tasks += 1,
                TaskState::Cancelled => stats.cancelled_tasks += 1,
                TaskState::DeletionPending => stats.deletion_pending_tasks += 1,
            }
            stats.max_depth = stats.max_depth.max(task.depth);
        }

        if stats.total_tasks > 0 {
            stats.completion_percentage =
                stats.completed_tasks as f64 / stats.total_tasks as f64 * 100.0;
        }

        stats
    }
}

/// Find every dependency cycle in a task list
pub fn detect_cycles(tasks: &[Task]) -> Vec<DependencyCycle> {
    DependencyGraph::new(tasks).detect_cycles()
}

/// Report dangling and otherwise broken references in a task list
pub fn validate_referential_integrity(tasks: &[Task]) -> Vec<IntegrityIssue> {
    DependencyGraph::new(tasks).validate_referential_integrity()
}

/// Render a chain listing with two spaces of indentation per level
pub fn render_chain(entries: &[ChainEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let marker = if entry.revisited { " (see above)" } else { "" };
        out.push_str(&format!(
            "{}{} {} [{}]{}\n",
            "  ".repeat(entry.level),
            if entry.level == 0 { "*" } else { "-" },
            entry.title,
            entry.state,
            marker
        ));
    }
    out
}

impl DependencyCycle {
    pub fn contains(&self, task_id: TaskId) -> bool {
        self.task_ids.contains(&task_id)
    }

    pub fn len(&self) -> usize {
        self.task_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.task_ids.is_empty()
    }
}

impl fmt::Display for DependencyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.task_ids.iter().map(|id| id.to_string()).collect();
        match self.task_ids.first() {
            Some(first) => write!(f, "{} -> {}", ids.join(" -> "), first),
            None => f.write_str("(empty)"),
        }
    }
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::DanglingDependency { task_id, missing } => {
                write!(f, "task {} depends on missing task {}", task_id, missing)
            }
            IntegrityIssue::SelfDependency { task_id } => {
                write!(f, "task {} depends on itself", task_id)
            }
            IntegrityIssue::MissingParent { task_id, parent_id } => {
                write!(f, "task {} has missing parent {}", task_id, parent_id)
            }
            IntegrityIssue::DepthMismatch {
                task_id,
                depth,
                expected,
            } => write!(
                f,
                "task {} has depth {} but its parent implies {}",
                task_id, depth, expected
            ),
        }
    }
}
