// Task store: in-memory list, persisted snapshot and remote mirror

use crate::error::{PersistenceError, RemoteError, TaskError};
use crate::filter::Filter;
use crate::remote::{NewTodo, Remote, TodoPayload};
use crate::storage::{Storage, TASKS_KEY};
use crate::task::{self, Task, TaskKey, TaskList};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How new tasks reach the list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Append immediately without an id
    Local,
    /// Append once the remote has assigned an id
    #[default]
    Remote,
}

/// Result of a successful `add`
#[derive(Debug)]
pub enum AddOutcome {
    /// Appended and persisted already
    Added(TaskKey),
    /// Waiting on the remote; apply the result with `TaskStore::apply_created`
    Pending(PendingCreate),
}

/// A create request detached from the store
#[derive(Clone)]
pub struct PendingCreate {
    remote: Arc<dyn Remote>,
    todo: NewTodo,
}

/// Task the remote has accepted, ready to be appended
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedTask {
    pub id: i64,
    pub text: String,
}

impl PendingCreate {
    pub fn text(&self) -> &str {
        &self.todo.title
    }

    /// Issue the create request.
    ///
    /// The returned task carries the text that was submitted, not the title
    /// the remote echoed back.
    pub async fn send(self) -> Result<CreatedTask, RemoteError> {
        match self.remote.create(&self.todo).await {
            Ok(created) => {
                if created.title.as_deref() != Some(self.todo.title.as_str()) {
                    debug!(id = created.id, echoed = ?created.title, "create: remote echoed a different title");
                }
                Ok(CreatedTask {
                    id: created.id,
                    text: self.todo.title,
                })
            }
            Err(e) => {
                warn!(text = %self.todo.title, error = %e, "create: remote call failed, task not added");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for PendingCreate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCreate").field("todo", &self.todo).finish()
    }
}

/// A best-effort update request detached from the store
#[derive(Clone)]
pub struct PendingUpdate {
    remote: Arc<dyn Remote>,
    id: i64,
    payload: TodoPayload,
}

impl PendingUpdate {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn payload(&self) -> &TodoPayload {
        &self.payload
    }

    /// Issue the update request. Failure never touches local state.
    pub async fn send(self) -> Result<(), RemoteError> {
        let result = self.remote.update(self.id, &self.payload).await;
        if let Err(e) = &result {
            warn!(id = self.id, error = %e, "update: remote call failed, local state kept");
        }
        result
    }
}

impl std::fmt::Debug for PendingUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingUpdate")
            .field("id", &self.id)
            .field("payload", &self.payload)
            .finish()
    }
}

/// Remote work still in flight after a local mutation
#[derive(Debug)]
pub enum Pending {
    Create(PendingCreate),
    Update(PendingUpdate),
}

/// Single source of truth for tasks, the active filter and their synchronization
pub struct TaskStore {
    tasks: TaskList,
    filter: Filter,
    mode: SyncMode,
    storage: Box<dyn Storage>,
    remote: Arc<dyn Remote>,
}

impl TaskStore {
    /// Build a store whose list is loaded from `storage`
    pub fn open(storage: Box<dyn Storage>, remote: Arc<dyn Remote>, mode: SyncMode) -> Self {
        let tasks = Self::load(storage.as_ref());
        info!(count = tasks.len(), ?mode, "Opened task store");
        Self {
            tasks,
            filter: Filter::default(),
            mode,
            storage,
            remote,
        }
    }

    /// Read the persisted snapshot.
    ///
    /// A missing key, a storage failure or malformed JSON all give an empty list.
    /// Entries with blank text are skipped.
    pub fn load(storage: &dyn Storage) -> TaskList {
        let snapshot = match storage.get(TASKS_KEY) {
            Ok(Some(s)) => s,
            Ok(None) => {
                debug!("load: no snapshot stored");
                return TaskList::new();
            }
            Err(e) => {
                warn!(error = %e, "load: failed to read snapshot, starting empty");
                return TaskList::new();
            }
        };

        match task::from_snapshot(&snapshot) {
            Ok(mut tasks) => {
                let total = tasks.len();
                tasks.retain(|t| !t.text.trim().is_empty());
                if tasks.len() < total {
                    warn!(skipped = total - tasks.len(), "load: skipping tasks with blank text");
                }
                tasks
            }
            Err(e) => {
                warn!(error = %e, "load: malformed snapshot, starting empty");
                TaskList::new()
            }
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, key: TaskKey) -> Option<&Task> {
        self.tasks.iter().find(|t| t.key() == key)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a task from user input.
    ///
    /// Whitespace-only input is rejected with `TaskError::Validation` and
    /// changes nothing. In remote mode the task is not appended until the
    /// returned `PendingCreate` resolves and is applied.
    pub fn add(&mut self, text: &str) -> Result<AddOutcome, TaskError> {
        let text = text.trim();
        if text.is_empty() {
            debug!("add: empty text ignored");
            return Err(TaskError::Validation);
        }

        match self.mode {
            SyncMode::Local => {
                let task = Task::new(text, None);
                let key = task.key();
                self.mutate(|tasks| tasks.push(task))?;
                debug!(%key, "add: appended local task");
                Ok(AddOutcome::Added(key))
            }
            SyncMode::Remote => Ok(AddOutcome::Pending(PendingCreate {
                remote: Arc::clone(&self.remote),
                todo: NewTodo {
                    title: text.to_string(),
                    completed: false,
                },
            })),
        }
    }

    /// Append a task the remote has accepted
    pub fn apply_created(&mut self, created: CreatedTask) -> Result<TaskKey, TaskError> {
        let task = Task::new(created.text, Some(created.id));
        let key = task.key();
        self.mutate(|tasks| tasks.push(task))?;
        debug!(%key, id = created.id, "add: appended remote task");
        Ok(key)
    }

    /// Add a task and, in remote mode, wait for the remote before appending
    pub async fn add_settled(&mut self, text: &str) -> Result<TaskKey, TaskError> {
        match self.add(text)? {
            AddOutcome::Added(key) => Ok(key),
            AddOutcome::Pending(pending) => {
                let created = pending.send().await?;
                self.apply_created(created)
            }
        }
    }

    /// Flip `completed` on the task and persist.
    ///
    /// Returns the remote update to send when the task has a remote id. The
    /// flip is already persisted by then, whatever happens to that update.
    pub fn toggle(&mut self, key: TaskKey) -> Result<Option<PendingUpdate>, TaskError> {
        let Some(index) = self.position(key) else {
            debug!(%key, "toggle: no such task");
            return Ok(None);
        };

        self.mutate(|tasks| tasks[index].toggle())?;

        let task = &self.tasks[index];
        debug!(%key, completed = task.completed, "toggle: applied locally");

        match (self.mode, task.id) {
            (SyncMode::Remote, Some(id)) => Ok(Some(PendingUpdate {
                remote: Arc::clone(&self.remote),
                id,
                payload: TodoPayload::from(task),
            })),
            _ => Ok(None),
        }
    }

    /// Remove exactly the task with this key. No remote call is made.
    pub fn remove(&mut self, key: TaskKey) -> Result<bool, TaskError> {
        let Some(index) = self.position(key) else {
            debug!(%key, "remove: no such task");
            return Ok(false);
        };

        self.mutate(|tasks| {
            tasks.remove(index);
        })?;
        debug!(%key, "remove: removed");
        Ok(true)
    }

    pub fn set_filter(&mut self, filter: Filter) {
        debug!(%filter, "set_filter");
        self.filter = filter;
    }

    /// Seed an empty list from the remote collection.
    ///
    /// Does nothing when the list already has tasks. Returns how many were added.
    pub async fn seed_from_remote(&mut self) -> Result<usize, TaskError> {
        if !self.tasks.is_empty() {
            debug!("seed: list not empty, skipping");
            return Ok(0);
        }

        let items = match self.remote.list().await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "seed: remote list failed");
                return Err(e.into());
            }
        };

        let seeded: Vec<Task> = items
            .into_iter()
            .filter(|item| !item.title.trim().is_empty())
            .map(|item| {
                let mut task = Task::new(item.title, Some(item.id));
                task.completed = item.completed;
                task
            })
            .collect();
        let count = seeded.len();

        self.mutate(|tasks| tasks.extend(seeded))?;
        info!(count, "seed: loaded tasks from remote");
        Ok(count)
    }

    /// Write the full list to storage
    pub fn persist(&mut self) -> Result<(), PersistenceError> {
        let snapshot = task::to_snapshot(&self.tasks)?;
        self.storage.set(TASKS_KEY, &snapshot)?;
        debug!(count = self.tasks.len(), "persist: snapshot written");
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn position(&self, key: TaskKey) -> Option<usize> {
        self.tasks.iter().position(|t| t.key() == key)
    }

    /// Apply `change` and persist, restoring the previous list if persisting fails
    fn mutate(&mut self, change: impl FnOnce(&mut TaskList)) -> Result<(), TaskError> {
        let previous = self.tasks.clone();
        change(&mut self.tasks);

        if let Err(e) = self.persist() {
            warn!(error = %e, "persist failed, operation dropped");
            self.tasks = previous;
            return Err(e.into());
        }
        Ok(())
    }
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks)
            .field("filter", &self.filter)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
