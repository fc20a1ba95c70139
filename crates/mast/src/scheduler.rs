//! Task Scheduling
//!
//! Deferred work is explicit: child mounts after a parent render, renders
//! caused by pattern changes and connection callbacks all go through one
//! FIFO queue that the runtime drains a turn at a time.

use crate::component::ComponentId;
use std::collections::VecDeque;

/// Task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Deferred work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Append `child` into its outlet, scheduled by `parent`'s render
    MountChild { parent: ComponentId, child: ComponentId },
    /// Re-render a component
    Render(ComponentId),
    /// Run the after-connect hook
    AfterConnect(ComponentId),
}

impl TaskKind {
    /// Component the task acts on
    pub fn subject(&self) -> ComponentId {
        match *self {
            TaskKind::MountChild { child, .. } => child,
            TaskKind::Render(id) | TaskKind::AfterConnect(id) => id,
        }
    }

    /// Whether the task acts on `id` or was scheduled on its behalf
    pub fn involves(&self, id: ComponentId) -> bool {
        match *self {
            TaskKind::MountChild { parent, child } => parent == id || child == id,
            TaskKind::Render(subject) | TaskKind::AfterConnect(subject) => subject == id,
        }
    }
}

/// Scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
}

/// Queue statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub scheduled: u64,
    /// Requests folded into an identical pending task
    pub coalesced: u64,
    pub cancelled: u64,
    pub turns: u64,
}

/// FIFO task queue
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
    next_task_id: u64,
    stats: QueueStats,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a task.
    ///
    /// An identical task that is still pending absorbs the request, so a
    /// component renders at most once per turn no matter how often its
    /// model changed.
    pub fn schedule(&mut self, kind: TaskKind) -> TaskId {
        if let Some(pending) = self.tasks.iter().find(|t| t.kind == kind) {
            self.stats.coalesced += 1;
            return pending.id;
        }

        let id = TaskId(self.next_task_id);
        self.next_task_id += 1;
        self.tasks.push_back(Task { id, kind });
        self.stats.scheduled += 1;
        id
    }

    /// Cancel one task
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let Some(pos) = self.tasks.iter().position(|t| t.id == id) else {
            return false;
        };
        self.tasks.remove(pos);
        self.stats.cancelled += 1;
        true
    }

    /// Cancel every task that involves `component`
    pub fn cancel_for(&mut self, component: ComponentId) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.kind.involves(component));
        let cancelled = before - self.tasks.len();
        self.stats.cancelled += cancelled as u64;
        cancelled
    }

    /// Cancel pending child mounts scheduled by `parent`
    pub fn cancel_mounts_from(&mut self, parent: ComponentId) -> usize {
        let before = self.tasks.len();
        self.tasks
            .retain(|t| !matches!(t.kind, TaskKind::MountChild { parent: p, .. } if p == parent));
        let cancelled = before - self.tasks.len();
        self.stats.cancelled += cancelled as u64;
        cancelled
    }

    /// Take every task queued so far; anything scheduled afterwards waits
    /// for the next turn
    pub fn take_turn(&mut self) -> Vec<Task> {
        self.stats.turns += 1;
        self.tasks.drain(..).collect()
    }

    /// Pending tasks in execution order
    pub fn pending(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mast_dom::Generation;

    fn c(n: u32) -> ComponentId {
        ComponentId::new(n, Generation::INITIAL)
    }

    #[test]
    fn test_fifo_and_turns() {
        let mut queue = TaskQueue::new();
        queue.schedule(TaskKind::Render(c(1)));
        queue.schedule(TaskKind::MountChild { parent: c(1), child: c(2) });

        let turn = queue.take_turn();
        assert_eq!(turn.len(), 2);
        assert_eq!(turn[0].kind, TaskKind::Render(c(1)));
        assert!(queue.is_empty());
        assert_eq!(queue.stats().turns, 1);
    }

    #[test]
    fn test_identical_tasks_coalesce() {
        let mut queue = TaskQueue::new();
        let first = queue.schedule(TaskKind::Render(c(3)));
        let second = queue.schedule(TaskKind::Render(c(3)));
        assert_eq!(first, second);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.stats().coalesced, 1);

        queue.take_turn();
        let third = queue.schedule(TaskKind::Render(c(3)));
        assert_ne!(first, third);
    }

    #[test]
    fn test_cancel_for_component() {
        let mut queue = TaskQueue::new();
        queue.schedule(TaskKind::MountChild { parent: c(1), child: c(2) });
        queue.schedule(TaskKind::MountChild { parent: c(1), child: c(3) });
        queue.schedule(TaskKind::Render(c(4)));
        let connect = queue.schedule(TaskKind::AfterConnect(c(4)));

        assert_eq!(queue.cancel_for(c(1)), 2);
        assert!(queue.cancel(connect));
        assert!(!queue.cancel(connect));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.stats().cancelled, 3);
    }

    #[test]
    fn test_cancel_mounts_from_parent_only() {
        let mut queue = TaskQueue::new();
        queue.schedule(TaskKind::MountChild { parent: c(1), child: c(2) });
        queue.schedule(TaskKind::Render(c(1)));
        assert_eq!(queue.cancel_mounts_from(c(1)), 1);
        assert_eq!(queue.pending().next().map(|t| t.kind), Some(TaskKind::Render(c(1))));
    }
}
