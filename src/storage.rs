// Durable key-value storage for the persisted snapshot

use crate::error::PersistenceError;
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tracing::debug;

/// Key under which the task list snapshot is stored
pub const TASKS_KEY: &str = "tasks";

/// Key-value store holding serialized snapshots
pub trait Storage: Send {
    /// Read the value stored under `key`, `None` if never written
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Replace the value stored under `key`
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

// ============================================================================
// SQLite backend
// ============================================================================

/// Storage backed by a single SQLite table
pub struct SqliteStorage {
    db: Connection,
}

impl SqliteStorage {
    /// Open or create `tasklist.db` inside `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, PersistenceError> {
        fs::create_dir_all(dir.as_ref())?;
        let db = Connection::open(dir.as_ref().join("tasklist.db"))?;
        Self::with_connection(db)
    }

    /// In-memory database, gone when dropped
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(db: Connection) -> Result<Self, PersistenceError> {
        debug!("Creating storage schema");
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self { db })
    }
}

impl Storage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value = self
            .db
            .query_row("SELECT value FROM storage WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.db.execute(
            "INSERT OR REPLACE INTO storage (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }
}

// ============================================================================
// JSON file backend
// ============================================================================

/// Storage keeping one `<key>.json` file per key
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, PersistenceError> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// Sidecar lock guarding `<key>.json`; the data file itself is replaced on write
    fn lock_for(&self, key: &str) -> Result<File, PersistenceError> {
        validate_key(key)?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.dir.join(format!("{}.lock", key)))?;
        Ok(file)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key)?;
        let lock = self.lock_for(key)?;
        lock.lock_shared()?;

        if !path.exists() {
            return Ok(None);
        }

        // Lock is released when `lock` is dropped
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        let lock = self.lock_for(key)?;
        lock.lock_exclusive()?;

        replace_file(&self.dir, &path, |file| file.write_all(value.as_bytes()))
    }
}

/// Write a sibling temp file with `write`, then rename it over `path`.
///
/// `path` keeps its previous content unless the whole new content reached disk.
fn replace_file(
    dir: &Path,
    path: &Path,
    write: impl FnOnce(&mut File) -> std::io::Result<()>,
) -> Result<(), PersistenceError> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    write(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    debug!(path = ?path, "replaced file");
    Ok(())
}

fn validate_key(key: &str) -> Result<(), PersistenceError> {
    if key.is_empty() || key.len() > 64 || !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(PersistenceError::InvalidKey(key.to_string()));
    }
    Ok(())
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Shared in-memory storage; clones see the same entries
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
    read_only: Arc<Mutex<bool>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` fail, as a full disk would
    pub fn set_read_only(&self, read_only: bool) {
        if let Ok(mut flag) = self.read_only.lock() {
            *flag = read_only;
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, PersistenceError> {
        self.entries
            .lock()
            .map_err(|_| PersistenceError::Io(std::io::Error::other("memory storage poisoned")))
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let read_only = self.read_only.lock().map(|flag| *flag).unwrap_or(true);
        if read_only {
            return Err(PersistenceError::Io(std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "storage quota exceeded",
            )));
        }
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sqlite_get_missing_key() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert_eq!(storage.get(TASKS_KEY).unwrap(), None);
    }

    #[test]
    fn test_sqlite_set_overwrites() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage.set(TASKS_KEY, "[1]").unwrap();
        storage.set(TASKS_KEY, "[2]").unwrap();
        assert_eq!(storage.get(TASKS_KEY).unwrap().as_deref(), Some("[2]"));
    }

    #[test]
    fn test_sqlite_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let mut storage = SqliteStorage::open(temp.path()).unwrap();
            storage.set(TASKS_KEY, "[]").unwrap();
        }
        assert!(temp.path().join("tasklist.db").exists());

        let storage = SqliteStorage::open(temp.path()).unwrap();
        assert_eq!(storage.get(TASKS_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_storage_round_trip() {
        let temp = TempDir::new().unwrap();
        let mut storage = FileStorage::open(temp.path().join("data")).unwrap();

        assert_eq!(storage.get(TASKS_KEY).unwrap(), None);

        storage.set(TASKS_KEY, r#"[{"text":"a long first value","completed":false}]"#).unwrap();
        storage.set(TASKS_KEY, "[]").unwrap();

        // Shorter write must not leave a tail of the previous value
        assert_eq!(storage.get(TASKS_KEY).unwrap().as_deref(), Some("[]"));
        assert!(temp.path().join("data/tasks.json").exists());
    }

    #[test]
    fn test_failed_write_keeps_previous_file() {
        let temp = TempDir::new().unwrap();
        let mut storage = FileStorage::open(temp.path()).unwrap();
        let before = r#"[{"text":"keep me","completed":false}]"#;
        storage.set(TASKS_KEY, before).unwrap();
        let path = temp.path().join("tasks.json");

        // Disk fills up halfway through the new snapshot
        let result = replace_file(temp.path(), &path, |file| {
            file.write_all(br#"[{"text":"keep me","completed":false},{""#)?;
            Err(std::io::Error::new(std::io::ErrorKind::StorageFull, "disk full"))
        });

        assert!(matches!(result, Err(PersistenceError::Io(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);

        let reopened = FileStorage::open(temp.path()).unwrap();
        assert_eq!(reopened.get(TASKS_KEY).unwrap().as_deref(), Some(before));
        assert_eq!(
            crate::store::TaskStore::load(&reopened),
            vec![crate::task::Task::new("keep me", None)]
        );

        // No stray temp files left next to the snapshot
        let mut names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["tasks.json", "tasks.lock"]);
    }

    #[test]
    fn test_file_storage_rejects_bad_key() {
        let temp = TempDir::new().unwrap();
        let mut storage = FileStorage::open(temp.path()).unwrap();

        assert!(matches!(
            storage.set("../escape", "x"),
            Err(PersistenceError::InvalidKey(_))
        ));
        assert!(storage.get("").is_err());
    }

    #[test]
    fn test_memory_storage_clones_share_entries() {
        let storage = MemoryStorage::new();
        let mut writer = storage.clone();
        writer.set(TASKS_KEY, "[]").unwrap();
        assert_eq!(storage.get(TASKS_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_memory_storage_read_only() {
        let mut storage = MemoryStorage::new();
        storage.set(TASKS_KEY, "[1]").unwrap();
        storage.set_read_only(true);

        assert!(storage.set(TASKS_KEY, "[2]").is_err());
        assert_eq!(storage.get(TASKS_KEY).unwrap().as_deref(), Some("[1]"));
    }
}
