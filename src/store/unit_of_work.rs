// src/store/unit_of_work.rs

//! Staging area for one transaction over a [`VersionedStore`].
//!
//! Reads are cached on first access and later reads see the transaction's
//! own writes. Writes are only staged; `commit` turns them into one
//! conditional batch whose expectations are the versions originally read.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use crate::errors::{Result, RexError};
use crate::model::{Task, TaskId};
use crate::store::{Checkout, CounterKey, Stamp, Version, Versioned, VersionedStore, Write};
use crate::types::State;

static NEXT_UNIT: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct Slot<T> {
    /// Committed version at first read; `None` if the entry was absent.
    base: Option<Version>,
    current: Option<T>,
    stamp: Stamp,
    dirty: bool,
}

impl<T> Slot<T> {
    fn loaded(entry: Option<Versioned<T>>) -> Self {
        match entry {
            Some(v) => Slot {
                base: Some(v.version),
                current: Some(v.value),
                stamp: Stamp::Committed(v.version),
                dirty: false,
            },
            None => Slot {
                base: None,
                current: None,
                stamp: Stamp::Absent,
                dirty: false,
            },
        }
    }
}

#[derive(Debug)]
pub struct UnitOfWork {
    id: u64,
    store: Arc<dyn VersionedStore>,
    tasks: BTreeMap<TaskId, Slot<Task>>,
    counters: BTreeMap<CounterKey, Slot<u64>>,
    next_stamp: u64,
}

impl UnitOfWork {
    pub fn new(store: Arc<dyn VersionedStore>) -> Self {
        Self {
            id: NEXT_UNIT.fetch_add(1, Ordering::Relaxed),
            store,
            tasks: BTreeMap::new(),
            counters: BTreeMap::new(),
            next_stamp: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn task_slot(&mut self, id: &str) -> Result<&mut Slot<Task>> {
        let slot = match self.tasks.entry(id.to_string()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let loaded = self.store.get_task(id)?;
                e.insert(Slot::loaded(loaded))
            }
        };
        Ok(slot)
    }

    fn counter_slot(&mut self, key: CounterKey) -> Result<&mut Slot<u64>> {
        let slot = match self.counters.entry(key) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let loaded = self.store.get_counter(key)?;
                e.insert(Slot::loaded(loaded))
            }
        };
        Ok(slot)
    }

    fn stage_stamp(&mut self) -> Stamp {
        self.next_stamp += 1;
        Stamp::Staged(self.next_stamp)
    }

    /// Read a task for mutation.
    pub fn get_task(&mut self, id: &str) -> Result<Option<Checkout<Task>>> {
        let unit = self.id;
        let slot = self.task_slot(id)?;
        Ok(slot
            .current
            .clone()
            .map(|task| Checkout::new(task, slot.stamp, unit)))
    }

    /// Read a task for mutation, failing if it does not exist.
    pub fn require_task(&mut self, id: &str) -> Result<Checkout<Task>> {
        self.get_task(id)?
            .ok_or_else(|| RexError::TaskMissing(format!("Task with name {id} was not found")))
    }

    /// Read-only view of a task as this unit of work sees it.
    pub fn peek_task(&mut self, id: &str) -> Result<Option<Task>> {
        Ok(self.task_slot(id)?.current.clone())
    }

    pub fn insert_if_absent(&mut self, task: Task) -> Result<()> {
        let stamp = self.stage_stamp();
        let slot = self.task_slot(&task.name)?;
        if slot.current.is_some() {
            return Err(RexError::Conflict(format!(
                "Declared task {} already exists",
                task.name
            )));
        }
        trace!(task = %task.name, "staged insert");
        slot.current = Some(task);
        slot.stamp = stamp;
        slot.dirty = true;
        Ok(())
    }

    /// Write back a mutated checkout. Fails if the entry changed since the
    /// checkout was taken, either in this unit of work or in the store.
    pub fn compare_and_swap(&mut self, checkout: Checkout<Task>) -> Result<()> {
        let stamp = self.stage_stamp();
        let name = checkout.name.clone();
        self.verify_task_checkout(&name, &checkout)?;
        let slot = self.task_slot(&name)?;
        slot.current = Some(checkout.into_value());
        slot.stamp = stamp;
        slot.dirty = true;
        trace!(task = %name, "staged replace");
        Ok(())
    }

    pub fn remove_if_version(&mut self, checkout: Checkout<Task>) -> Result<()> {
        let stamp = self.stage_stamp();
        let name = checkout.name.clone();
        self.verify_task_checkout(&name, &checkout)?;
        let slot = self.task_slot(&name)?;
        slot.current = None;
        slot.stamp = stamp;
        slot.dirty = true;
        trace!(task = %name, "staged remove");
        Ok(())
    }

    fn verify_task_checkout(&mut self, name: &str, checkout: &Checkout<Task>) -> Result<()> {
        if checkout.unit != self.id {
            return Err(RexError::IllegalState(format!(
                "checkout of task {name} belongs to another transaction"
            )));
        }
        let slot_stamp = self.task_slot(name)?.stamp;
        if slot_stamp != checkout.stamp {
            return Err(RexError::ConcurrentUpdate(format!(
                "task {name} was modified after it was read"
            )));
        }
        if let Stamp::Committed(expected) = checkout.stamp {
            let stored = self.store.get_task(name)?.map(|v| v.version);
            if stored != Some(expected) {
                return Err(RexError::ConcurrentUpdate(format!(
                    "task {name} was modified concurrently (expected {expected})"
                )));
            }
        }
        Ok(())
    }

    /// Read an admission counter. A counter that was never written reads as 0.
    pub fn get_counter(&mut self, key: CounterKey) -> Result<Checkout<u64>> {
        let unit = self.id;
        let slot = self.counter_slot(key)?;
        Ok(Checkout::new(slot.current.unwrap_or(0), slot.stamp, unit))
    }

    pub fn compare_and_swap_counter(
        &mut self,
        key: CounterKey,
        checkout: Checkout<u64>,
    ) -> Result<()> {
        if checkout.unit != self.id {
            return Err(RexError::IllegalState(format!(
                "checkout of counter {key} belongs to another transaction"
            )));
        }
        let stamp = self.stage_stamp();
        let expected = match checkout.stamp {
            Stamp::Committed(v) => Some(v),
            _ => None,
        };
        let check_store = matches!(checkout.stamp, Stamp::Committed(_) | Stamp::Absent);
        let stored = if check_store {
            Some(self.store.get_counter(key)?.map(|v| v.version))
        } else {
            None
        };

        let slot = self.counter_slot(key)?;
        if slot.stamp != checkout.stamp || stored.is_some_and(|s| s != expected) {
            return Err(RexError::ConcurrentUpdate(format!(
                "counter {key} was modified concurrently"
            )));
        }
        slot.current = Some(checkout.into_value());
        slot.stamp = stamp;
        slot.dirty = true;
        Ok(())
    }

    /// Tasks in any of `states`, ordered by identifier, including this unit
    /// of work's own staged changes.
    pub fn query_tasks(&mut self, states: &[State], limit: Option<usize>) -> Result<Vec<Task>> {
        let mut found: BTreeMap<TaskId, Task> = self
            .store
            .query_tasks(states, None)?
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();

        for (id, slot) in &self.tasks {
            match &slot.current {
                Some(task) if states.contains(&task.state) => {
                    found.insert(id.clone(), task.clone());
                }
                _ => {
                    found.remove(id);
                }
            }
        }

        let limit = limit.unwrap_or(usize::MAX);
        Ok(found.into_values().take(limit).collect())
    }

    /// Whether anything was written.
    pub fn is_dirty(&self) -> bool {
        self.tasks.values().any(|s| s.dirty) || self.counters.values().any(|s| s.dirty)
    }

    /// Send all staged writes to the store as one conditional batch.
    pub fn commit(self) -> Result<()> {
        let mut writes = Vec::new();

        for (id, slot) in self.tasks {
            if !slot.dirty {
                continue;
            }
            match (slot.base, slot.current) {
                (None, Some(task)) => writes.push(Write::InsertTask(task)),
                (Some(expected), Some(task)) => writes.push(Write::ReplaceTask { expected, task }),
                (Some(expected), None) => writes.push(Write::RemoveTask { id, expected }),
                // inserted and removed again before commit
                (None, None) => {}
            }
        }

        for (key, slot) in self.counters {
            if let (true, Some(value)) = (slot.dirty, slot.current) {
                writes.push(Write::PutCounter {
                    key,
                    expected: slot.base,
                    value,
                });
            }
        }

        if writes.is_empty() {
            return Ok(());
        }

        debug!(unit = self.id, writes = writes.len(), "committing unit of work");
        self.store.commit(writes)
    }
}
