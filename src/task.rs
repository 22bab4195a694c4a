// Data model for tasks

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable in-memory identity for a task.
///
/// Keys are handed out when a task enters the list (on load or add) and are
/// never persisted. Two tasks with identical fields still have different keys,
/// so commands built from a key always hit the task they were built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskKey(Uuid);

impl TaskKey {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TaskKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single to-do item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(skip, default)]
    key: TaskKey,
    /// Identifier assigned by the remote collection, absent for local-only tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    /// New incomplete task with a fresh key
    pub fn new(text: impl Into<String>, id: Option<i64>) -> Self {
        Self {
            key: TaskKey::new(),
            id,
            text: text.into(),
            completed: false,
        }
    }

    pub fn key(&self) -> TaskKey {
        self.key
    }

    pub fn toggle(&mut self) {
        self.completed = !self.completed;
    }
}

/// Equality over the persisted fields only; keys are process-local.
impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.text == other.text && self.completed == other.completed
    }
}

impl Eq for Task {}

/// Ordered list of tasks, insertion order is display order
pub type TaskList = Vec<Task>;

/// Serialize a list into its persisted form
pub fn to_snapshot(tasks: &[Task]) -> serde_json::Result<String> {
    serde_json::to_string(tasks)
}

/// Parse a persisted snapshot, assigning fresh keys
pub fn from_snapshot(snapshot: &str) -> serde_json::Result<TaskList> {
    serde_json::from_str(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_serialization_omits_key_and_missing_id() {
        let task = Task::new("buy milk", None);
        let json = serde_json::to_string(&task).unwrap();
        assert_eq!(json, r#"{"text":"buy milk","completed":false}"#);

        let task = Task::new("walk dog", Some(7));
        let json = serde_json::to_string(&task).unwrap();
        assert_eq!(json, r#"{"id":7,"text":"walk dog","completed":false}"#);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut done = Task::new("b", Some(2));
        done.toggle();
        let tasks = vec![Task::new("a", None), done, Task::new("a", None)];

        let snapshot = to_snapshot(&tasks).unwrap();
        let reloaded = from_snapshot(&snapshot).unwrap();

        assert_eq!(reloaded, tasks);
    }

    #[test]
    fn test_reload_assigns_fresh_distinct_keys() {
        let tasks = vec![Task::new("same", None), Task::new("same", None)];
        let reloaded = from_snapshot(&to_snapshot(&tasks).unwrap()).unwrap();

        assert_ne!(reloaded[0].key(), reloaded[1].key());
        assert_ne!(reloaded[0].key(), tasks[0].key());
    }

    #[test]
    fn test_equality_ignores_key() {
        let a = Task::new("same", None);
        let b = Task::new("same", None);
        assert_ne!(a.key(), b.key());
        assert_eq!(a, b);
    }

    #[test]
    fn test_completed_defaults_to_false() {
        let tasks = from_snapshot(r#"[{"text":"legacy"}]"#).unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(!tasks[0].completed);
        assert_eq!(tasks[0].id, None);
    }
}
