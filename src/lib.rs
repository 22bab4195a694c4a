// tasklist - task list with local persistence and best-effort remote sync

pub mod config;
pub mod error;
pub mod filter;
pub mod remote;
pub mod render;
pub mod storage;
pub mod store;
pub mod task;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use error::{PersistenceError, RemoteError, TaskError};
pub use filter::Filter;
pub use remote::{HttpRemote, NoRemote, Remote};
pub use storage::{FileStorage, MemoryStorage, SqliteStorage, Storage};
pub use store::{AddOutcome, CreatedTask, Pending, PendingCreate, PendingUpdate, SyncMode, TaskStore};
pub use task::{Task, TaskKey, TaskList};
pub use view::{Command, Frame, Gesture, MenuState, RenderRecord, Renderer, ViewProjector, project};
