// src/store/memory.rs

//! In-process [`VersionedStore`] backed by ordered maps behind a mutex.
//!
//! Every applied write bumps a single store-wide version sequence, so a
//! version never repeats for an entry even across remove + re-insert.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::trace;

use crate::errors::{Result, RexError};
use crate::model::{Task, TaskId};
use crate::store::{CounterKey, Version, Versioned, VersionedStore, Write};
use crate::types::State;

#[derive(Debug, Default)]
struct Inner {
    tasks: BTreeMap<TaskId, Versioned<Task>>,
    counters: BTreeMap<CounterKey, Versioned<u64>>,
    last_version: u64,
}

impl Inner {
    fn next_version(&mut self) -> Version {
        self.last_version += 1;
        Version::new(self.last_version)
    }

    fn check(&self, write: &Write) -> Result<()> {
        match write {
            Write::InsertTask(task) => {
                if self.tasks.contains_key(&task.name) {
                    return Err(RexError::Conflict(format!(
                        "Declared task {} already exists",
                        task.name
                    )));
                }
            }
            Write::ReplaceTask { expected, task } => {
                self.check_task_version(&task.name, *expected)?;
            }
            Write::RemoveTask { id, expected } => {
                self.check_task_version(id, *expected)?;
            }
            Write::PutCounter { key, expected, .. } => {
                let stored = self.counters.get(key).map(|v| v.version);
                if stored != *expected {
                    return Err(RexError::ConcurrentUpdate(format!(
                        "counter {key} was modified concurrently"
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_task_version(&self, id: &str, expected: Version) -> Result<()> {
        match self.tasks.get(id) {
            Some(stored) if stored.version == expected => Ok(()),
            Some(stored) => Err(RexError::ConcurrentUpdate(format!(
                "task {id} is at {} but {expected} was expected",
                stored.version
            ))),
            None => Err(RexError::ConcurrentUpdate(format!(
                "task {id} was removed concurrently"
            ))),
        }
    }

    fn apply(&mut self, write: Write) {
        let version = self.next_version();
        match write {
            Write::InsertTask(task) | Write::ReplaceTask { task, .. } => {
                self.tasks
                    .insert(task.name.clone(), Versioned { value: task, version });
            }
            Write::RemoveTask { id, .. } => {
                self.tasks.remove(&id);
            }
            Write::PutCounter { key, value, .. } => {
                self.counters.insert(key, Versioned { value, version });
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks.
    pub fn len(&self) -> usize {
        self.inner.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VersionedStore for MemoryStore {
    fn get_task(&self, id: &str) -> Result<Option<Versioned<Task>>> {
        Ok(self.inner.lock().tasks.get(id).cloned())
    }

    fn get_counter(&self, key: CounterKey) -> Result<Option<Versioned<u64>>> {
        Ok(self.inner.lock().counters.get(&key).cloned())
    }

    fn query_tasks(&self, states: &[State], limit: Option<usize>) -> Result<Vec<Task>> {
        let inner = self.inner.lock();
        Ok(inner
            .tasks
            .values()
            .filter(|v| states.contains(&v.value.state))
            .take(limit.unwrap_or(usize::MAX))
            .map(|v| v.value.clone())
            .collect())
    }

    fn commit(&self, writes: Vec<Write>) -> Result<()> {
        let mut inner = self.inner.lock();
        for write in &writes {
            inner.check(write)?;
        }
        trace!(writes = writes.len(), "applying commit");
        for write in writes {
            inner.apply(write);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Request, TaskTemplate};
    use crate::types::{Method, Mode};

    fn task(name: &str, state: State) -> Task {
        let mut t = Task::from_template(
            name,
            &TaskTemplate {
                remote_start: Request::new(Method::Post, "http://w/start"),
                remote_cancel: Request::new(Method::Post, "http://w/stop"),
                caller_notification: None,
                mode: Mode::Idle,
            },
        );
        t.state = state;
        t
    }

    #[test]
    fn failed_expectation_leaves_store_untouched() {
        let store = MemoryStore::new();
        store
            .commit(vec![Write::InsertTask(task("a", State::New))])
            .unwrap();
        let a = store.get_task("a").unwrap().unwrap();

        let err = store
            .commit(vec![
                Write::InsertTask(task("b", State::New)),
                Write::ReplaceTask {
                    expected: Version::new(a.version.get() + 10),
                    task: task("a", State::Waiting),
                },
            ])
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(store.get_task("b").unwrap().is_none());
        assert_eq!(store.get_task("a").unwrap().unwrap(), a);
    }

    #[test]
    fn every_write_gets_a_fresh_version() {
        let store = MemoryStore::new();
        store
            .commit(vec![Write::InsertTask(task("a", State::New))])
            .unwrap();
        let v1 = store.get_task("a").unwrap().unwrap().version;
        store
            .commit(vec![Write::ReplaceTask {
                expected: v1,
                task: task("a", State::Waiting),
            }])
            .unwrap();
        let v2 = store.get_task("a").unwrap().unwrap().version;
        assert!(v2 > v1);
    }

    #[test]
    fn query_filters_by_state_in_identifier_order() {
        let store = MemoryStore::new();
        store
            .commit(vec![
                Write::InsertTask(task("c", State::Enqueued)),
                Write::InsertTask(task("a", State::Enqueued)),
                Write::InsertTask(task("b", State::Up)),
            ])
            .unwrap();

        let names: Vec<_> = store
            .query_tasks(&[State::Enqueued], Some(5))
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["a", "c"]);

        assert_eq!(store.query_tasks(&[State::Enqueued], Some(1)).unwrap().len(), 1);
    }
}
