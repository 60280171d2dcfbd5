use crate::task::{Task, TaskId, TaskKind};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What survives a restart: enough to re-attach polling to a job
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub task_id: TaskId,
    pub task_kind: TaskKind,
}

impl SessionRecord {
    /// Save record to disk using atomic write pattern
    pub fn save(&self, path: &Path) -> Result<()> {
        let temp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).context("Failed to serialize session")?;

        std::fs::write(&temp_path, json).with_context(|| {
            format!(
                "Failed to write temporary session file: {}",
                temp_path.display()
            )
        })?;

        std::fs::rename(&temp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            )
        })?;

        tracing::info!(
            "Session saved to {} ({} task {})",
            path.display(),
            self.task_kind,
            self.task_id
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;

        let record: SessionRecord =
            serde_json::from_str(&json).context("Failed to deserialize session")?;

        tracing::info!(
            "Session loaded from {} ({} task {})",
            path.display(),
            record.task_kind,
            record.task_id
        );
        Ok(record)
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn delete(path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to delete session file: {}", path.display()))?;
            tracing::info!("Session file deleted: {}", path.display());
        }

        let temp_path = path.with_extension("json.tmp");
        if temp_path.exists() {
            let _ = std::fs::remove_file(&temp_path);
            tracing::debug!("Cleaned up temporary session file: {}", temp_path.display());
        }

        Ok(())
    }
}

/// Single source of truth for which task, if any, is active.
///
/// `begin` and `clear` are mirrored to the session file when one is
/// configured. A mirror failure is logged and never rolls back the
/// in-memory state.
#[derive(Debug, Default)]
pub struct TaskStateStore {
    active: Option<Task>,
    path: Option<PathBuf>,
}

impl TaskStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            active: None,
            path: Some(path),
        }
    }

    /// Store without a durable mirror
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Read a previously persisted task, dropping unreadable files
    pub fn recover(&self) -> Option<SessionRecord> {
        let path = self.path.as_deref()?;
        if !SessionRecord::exists(path) {
            return None;
        }
        match SessionRecord::load(path) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Failed to load session file: {}, discarding", e);
                let _ = SessionRecord::delete(path);
                None
            }
        }
    }

    /// Track a new task, replacing any previous one without contacting the
    /// server about it.
    pub fn begin(&mut self, kind: TaskKind, id: TaskId) -> &Task {
        if let Some(previous) = &self.active {
            tracing::info!(
                "Superseding local tracking of {} task {}",
                previous.kind,
                previous.id
            );
        }

        if let Some(path) = &self.path {
            let record = SessionRecord {
                task_id: id.clone(),
                task_kind: kind,
            };
            if let Err(e) = record.save(path) {
                tracing::error!("Failed to save session: {}", e);
            }
        }

        self.active.insert(Task::new(id, kind))
    }

    pub fn current(&self) -> Option<&Task> {
        self.active.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Task> {
        self.active.as_mut()
    }

    pub fn is_current(&self, id: &TaskId) -> bool {
        self.active.as_ref().is_some_and(|task| &task.id == id)
    }

    pub fn clear(&mut self) -> Option<Task> {
        if let Some(path) = &self.path {
            if let Err(e) = SessionRecord::delete(path) {
                tracing::error!("Failed to clear session: {}", e);
            }
        }
        self.active.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> (TaskStateStore, PathBuf) {
        let path = dir.path().join("active_task.json");
        (TaskStateStore::new(path.clone()), path)
    }

    #[test]
    fn test_begin_persists_and_clear_removes() {
        let dir = TempDir::new().unwrap();
        let (mut store, path) = store_in(&dir);

        store.begin(TaskKind::Scan, TaskId::new("scan_1"));
        assert!(path.exists());
        assert_eq!(
            SessionRecord::load(&path).unwrap(),
            SessionRecord {
                task_id: TaskId::new("scan_1"),
                task_kind: TaskKind::Scan,
            }
        );

        let cleared = store.clear().unwrap();
        assert_eq!(cleared.id, TaskId::new("scan_1"));
        assert!(!path.exists());
        assert!(store.current().is_none());
    }

    #[test]
    fn test_begin_overwrites_previous() {
        let dir = TempDir::new().unwrap();
        let (mut store, path) = store_in(&dir);

        store.begin(TaskKind::Scan, TaskId::new("scan_1"));
        store.begin(TaskKind::Fix, TaskId::new("fix_2"));

        assert!(!store.is_current(&TaskId::new("scan_1")));
        assert!(store.is_current(&TaskId::new("fix_2")));
        assert_eq!(SessionRecord::load(&path).unwrap().task_kind, TaskKind::Fix);
    }

    #[test]
    fn test_recover_after_restart() {
        let dir = TempDir::new().unwrap();
        let (mut store, path) = store_in(&dir);
        store.begin(TaskKind::Fix, TaskId::new("fix_9"));
        drop(store);

        let reopened = TaskStateStore::new(path);
        let record = reopened.recover().unwrap();
        assert_eq!(record.task_id, TaskId::new("fix_9"));
        assert!(reopened.current().is_none());
    }

    #[test]
    fn test_recover_discards_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("active_task.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = TaskStateStore::new(path.clone());
        assert!(store.recover().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_in_memory_store() {
        let mut store = TaskStateStore::in_memory();
        assert!(store.recover().is_none());
        store.begin(TaskKind::Scan, TaskId::new("scan_1"));
        assert!(store.current().is_some());
        store.clear();
        assert!(store.clear().is_none());
    }
}
