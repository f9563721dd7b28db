//! The task queue state machine: pending (deque), running, completed,
//! failed, skipped. See `SPEC_FULL.md` §4.5.

use std::collections::VecDeque;

use chrono::Utc;
use recon_domain::{Task, TaskStatus};

#[derive(Debug, Default)]
pub struct ScanPlan {
    pub pending: VecDeque<Task>,
    pub running: Vec<Task>,
    pub completed: Vec<Task>,
    pub failed: Vec<Task>,
    pub skipped: Vec<Task>,
}

impl ScanPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&mut self, task: Task, priority: bool) {
        if priority {
            self.pending.push_front(task);
        } else {
            self.pending.push_back(task);
        }
    }

    pub fn pop_next(&mut self) -> Option<Task> {
        self.pending.pop_front()
    }

    fn remove_running(&mut self, task_id: uuid::Uuid) -> Option<Task> {
        let idx = self.running.iter().position(|t| t.id == task_id)?;
        Some(self.running.remove(idx))
    }

    pub fn mark_running(&mut self, mut task: Task) {
        task.status = TaskStatus::Running;
        task.started_at = Some(Utc::now());
        self.running.push(task);
    }

    pub fn mark_completed(&mut self, task_id: uuid::Uuid) {
        if let Some(mut task) = self.remove_running(task_id) {
            task.status = TaskStatus::Completed;
            task.completed_at = Some(Utc::now());
            task.progress = 100.0;
            self.completed.push(task);
        }
    }

    pub fn mark_failed(&mut self, task_id: uuid::Uuid, error: impl Into<String>) {
        if let Some(mut task) = self.remove_running(task_id) {
            task.status = TaskStatus::Failed;
            task.completed_at = Some(Utc::now());
            task.error = Some(error.into());
            self.failed.push(task);
        }
    }

    pub fn mark_skipped(&mut self, task_id: uuid::Uuid) {
        if let Some(mut task) = self.remove_running(task_id) {
            task.status = TaskStatus::Skipped;
            task.completed_at = Some(Utc::now());
            self.skipped.push(task);
        }
    }

    /// For a task that never entered `running` (e.g. its tool could not be
    /// looked up), record it straight into `failed`.
    pub fn fail_direct(&mut self, mut task: Task, error: impl Into<String>) {
        task.status = TaskStatus::Failed;
        task.completed_at = Some(Utc::now());
        task.error = Some(error.into());
        self.failed.push(task);
    }

    pub fn all_tasks(&self) -> Vec<&Task> {
        self.pending
            .iter()
            .chain(self.running.iter())
            .chain(self.completed.iter())
            .chain(self.failed.iter())
            .chain(self.skipped.iter())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_domain::Metadata;

    fn task(name: &str) -> Task {
        Task::new(name, format!("run {name}"), Metadata::new())
    }

    #[test]
    fn priority_task_jumps_the_queue() {
        let mut plan = ScanPlan::new();
        plan.add_task(task("subfinder"), false);
        plan.add_task(task("nmap"), true);
        assert_eq!(plan.pop_next().unwrap().name, "nmap");
        assert_eq!(plan.pop_next().unwrap().name, "subfinder");
    }

    #[test]
    fn full_lifecycle_keeps_buckets_disjoint() {
        let mut plan = ScanPlan::new();
        let t1 = task("subfinder");
        let t2 = task("amass");
        let t3 = task("whois");
        let t4 = task("nuclei");
        let (id1, id2, id3, id4) = (t1.id, t2.id, t3.id, t4.id);

        plan.add_task(t1, false);
        plan.add_task(t2, false);
        plan.add_task(t3, false);
        plan.add_task(t4, false);

        let popped1 = plan.pop_next().unwrap();
        plan.mark_running(popped1);
        let popped2 = plan.pop_next().unwrap();
        plan.mark_running(popped2);
        let popped3 = plan.pop_next().unwrap();
        plan.mark_running(popped3);
        let popped4 = plan.pop_next().unwrap();
        plan.mark_running(popped4);

        plan.mark_completed(id1);
        plan.mark_failed(id2, "tool crashed");
        plan.mark_skipped(id3);

        assert_eq!(plan.running.len(), 1);
        assert_eq!(plan.running[0].id, id4);
        assert_eq!(plan.completed.len(), 1);
        assert_eq!(plan.failed.len(), 1);
        assert_eq!(plan.failed[0].error.as_deref(), Some("tool crashed"));
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.all_tasks().len(), 4);
    }

    #[test]
    fn mark_completed_sets_full_progress() {
        let mut plan = ScanPlan::new();
        let t = task("httpx");
        let id = t.id;
        plan.add_task(t, false);
        let popped = plan.pop_next().unwrap();
        plan.mark_running(popped);
        plan.mark_completed(id);
        assert_eq!(plan.completed[0].progress, 100.0);
        assert!(plan.completed[0].completed_at.is_some());
    }
}
