//! Flat map of live tasks: label, cooperative cancel flag and the handle of
//! the invocation currently running for the task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::provider::RunningTask;

struct TaskEntry {
    label: String,
    cancelled: bool,
    handle: Option<Box<dyn RunningTask>>,
}

#[derive(Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<String, TaskEntry>>,
}

impl TaskRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TaskEntry>> {
        // A poisoned map is still structurally valid; keep serving it.
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers `task_id` and returns the guard whose drop unregisters it.
    ///
    /// Re-registering a live id replaces the previous entry (its handle is
    /// dropped without disposal).
    pub fn register(self: &Arc<Self>, task_id: &str, label: &str) -> TaskGuard {
        let prev = self.lock().insert(
            task_id.to_string(),
            TaskEntry {
                label: label.to_string(),
                cancelled: false,
                handle: None,
            },
        );
        if prev.is_some() {
            tracing::warn!(task_id, "task id re-registered while still live");
        }
        tracing::debug!(task_id, label, "task registered");
        TaskGuard {
            registry: Arc::clone(self),
            task_id: task_id.to_string(),
            released: false,
        }
    }

    /// Removes the entry. Returns false if the id was unknown.
    pub fn unregister(&self, task_id: &str) -> bool {
        let removed = self.lock().remove(task_id).is_some();
        if removed {
            tracing::debug!(task_id, "task unregistered");
        }
        removed
    }

    /// Sets the cancel flag. The running invocation is not interrupted; the
    /// owner observes the flag at its next checkpoint.
    pub fn cancel(&self, task_id: &str) -> bool {
        match self.lock().get_mut(task_id) {
            Some(entry) => {
                entry.cancelled = true;
                tracing::info!(task_id, "task cancellation requested");
                true
            }
            None => false,
        }
    }

    pub fn is_cancelled(&self, task_id: &str) -> bool {
        self.lock()
            .get(task_id)
            .map(|e| e.cancelled)
            .unwrap_or(false)
    }

    /// Installs the handle of the task's current invocation, replacing the
    /// previous one. Hands the handle back if the task is not registered.
    pub fn update_handle(
        &self,
        task_id: &str,
        handle: Box<dyn RunningTask>,
    ) -> Result<(), Box<dyn RunningTask>> {
        match self.lock().get_mut(task_id) {
            Some(entry) => {
                entry.handle = Some(handle);
                Ok(())
            }
            None => Err(handle),
        }
    }

    /// Drops the handle once its invocation has completed.
    pub fn clear_handle(&self, task_id: &str) {
        if let Some(entry) = self.lock().get_mut(task_id) {
            entry.handle = None;
        }
    }

    /// Disposes the current handle, if any. Returns true if one was disposed.
    pub fn dispose(&self, task_id: &str) -> bool {
        let handle = self.lock().get_mut(task_id).and_then(|e| e.handle.take());
        match handle {
            Some(mut h) => {
                h.dispose();
                true
            }
            None => false,
        }
    }

    pub fn label(&self, task_id: &str) -> Option<String> {
        self.lock().get(task_id).map(|e| e.label.clone())
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.lock().contains_key(task_id)
    }

    pub fn task_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owns one registration. Dropping it unregisters the task exactly once,
/// whichever path the owning run exits through.
pub struct TaskGuard {
    registry: Arc<TaskRegistry>,
    task_id: String,
    released: bool,
}

impl TaskGuard {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.registry.is_cancelled(&self.task_id)
    }

    /// Unregisters now instead of at drop.
    pub fn release(mut self) {
        self.unregister_once();
    }

    fn unregister_once(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.unregister(&self.task_id);
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.unregister_once();
    }
}
