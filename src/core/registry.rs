use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use super::task::FetchTask;

/// The set of tasks currently pending, keyed by request identity.
///
/// Every operation runs under one mutex and none of them awaits, so access
/// never waits on the network or disk work a task performs. Finished tasks
/// are removed, not retained: this is not a result cache.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<String, FetchTask>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, FetchTask>> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `task` under `key`, returning the task it replaced.
    pub fn insert(&self, task: FetchTask, key: impl Into<String>) -> Option<FetchTask> {
        self.lock().insert(key.into(), task)
    }

    pub fn get(&self, key: &str) -> Option<FetchTask> {
        self.lock().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<FetchTask> {
        self.lock().remove(key)
    }

    /// Removes the entry for `key` only if it is the task with `id`.
    pub fn remove_task(&self, key: &str, id: Uuid) -> Option<FetchTask> {
        let mut tasks = self.lock();
        match tasks.get(key) {
            Some(task) if task.id() == id => tasks.remove(key),
            _ => None,
        }
    }

    /// Returns the pending task for `key`, or registers the one built by `make`.
    ///
    /// Lookup and registration happen under a single lock acquisition. The
    /// flag is `true` when `make` ran. `make` must not block.
    pub fn get_or_insert_with<F>(&self, key: &str, make: F) -> (FetchTask, bool)
    where
        F: FnOnce() -> FetchTask,
    {
        let mut tasks = self.lock();
        if let Some(task) = tasks.get(key) {
            return (task.clone(), false);
        }
        let task = make();
        tasks.insert(key.to_string(), task.clone());
        (task, true)
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FetchError;
    use crate::core::task::tests::ready_task;
    use std::sync::Arc;

    fn task(url: &str) -> FetchTask {
        ready_task(url, Err(FetchError::NoResult))
    }

    #[test]
    fn test_insert_get_remove() {
        let registry = TaskRegistry::new();
        let a = task("https://x/a.png");

        assert!(registry.insert(a.clone(), a.key()).is_none());
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.get(a.key()), Some(a.clone()));

        assert_eq!(registry.remove(a.key()), Some(a.clone()));
        assert!(registry.get(a.key()).is_none());
        assert!(registry.remove(a.key()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_insert_overwrites() {
        let registry = TaskRegistry::new();
        let first = task("https://x/a.png");
        let second = task("https://x/a.png");

        registry.insert(first.clone(), first.key());
        let replaced = registry.insert(second.clone(), second.key());

        assert_eq!(replaced, Some(first));
        assert_eq!(registry.get(second.key()), Some(second));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_remove_task_checks_identity() {
        let registry = TaskRegistry::new();
        let stale = task("https://x/a.png");
        let current = task("https://x/a.png");
        registry.insert(current.clone(), current.key());

        assert!(registry.remove_task(stale.key(), stale.id()).is_none());
        assert_eq!(registry.count(), 1);

        assert_eq!(registry.remove_task(current.key(), current.id()), Some(current));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_get_or_insert_with_only_builds_once() {
        let registry = TaskRegistry::new();
        let a = task("https://x/a.png");
        let key = a.key().to_string();

        let (first, created) = registry.get_or_insert_with(&key, || a.clone());
        assert!(created);
        assert_eq!(first, a);

        let (second, created) =
            registry.get_or_insert_with(&key, || panic!("must not build a second task"));
        assert!(!created);
        assert_eq!(second, a);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_concurrent_access() {
        let registry = Arc::new(TaskRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let t = task(&format!("https://x/{worker}/{i}.png"));
                        registry.insert(t.clone(), t.key());
                        assert!(registry.get(t.key()).is_some());
                        if i % 2 == 0 {
                            registry.remove(t.key());
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.count(), 8 * 100);
    }
}
