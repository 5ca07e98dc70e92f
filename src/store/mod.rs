// src/store/mod.rs

//! Versioned task storage.
//!
//! Responsibilities:
//! - Define the consumed store contract (`VersionedStore`): point reads that
//!   return a value together with its version, a state query, and an atomic
//!   conditional commit of a batch of writes.
//! - Stage reads and writes of one transaction (`UnitOfWork`), handing out
//!   `Checkout`s that must be spent on exactly one write.
//! - Provide an in-process implementation (`MemoryStore`).

pub mod memory;
pub mod unit_of_work;

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::errors::Result;
use crate::model::{Task, TaskId};
use crate::types::State;

pub use memory::MemoryStore;
pub use unit_of_work::UnitOfWork;

/// Version of a committed store entry. Every committed write produces a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    pub fn new(raw: u64) -> Self {
        Version(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A committed value together with the version it was stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: Version,
}

/// The two admission counters, stored as single-row entries next to tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CounterKey {
    Running,
    MaxConcurrent,
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterKey::Running => f.write_str("running"),
            CounterKey::MaxConcurrent => f.write_str("max-concurrent"),
        }
    }
}

/// A conditional write. All writes of one commit succeed or none do.
#[derive(Debug, Clone)]
pub enum Write {
    /// Fails with a conflict if the task already exists.
    InsertTask(Task),
    ReplaceTask { expected: Version, task: Task },
    RemoveTask { id: TaskId, expected: Version },
    /// `expected == None` means the counter must not exist yet.
    PutCounter {
        key: CounterKey,
        expected: Option<Version>,
        value: u64,
    },
}

/// Storage contract consumed by the scheduler.
///
/// Implementations must make `commit` atomic: either every write's
/// expectation holds and all are applied, or nothing changes. A write whose
/// expected version does not match fails with
/// [`RexError::ConcurrentUpdate`](crate::errors::RexError::ConcurrentUpdate);
/// an insert over an existing task fails with
/// [`RexError::Conflict`](crate::errors::RexError::Conflict).
pub trait VersionedStore: Send + Sync + fmt::Debug {
    fn get_task(&self, id: &str) -> Result<Option<Versioned<Task>>>;

    fn get_counter(&self, key: CounterKey) -> Result<Option<Versioned<u64>>>;

    /// Committed tasks whose state is one of `states`, ordered by identifier.
    fn query_tasks(&self, states: &[State], limit: Option<usize>) -> Result<Vec<Task>>;

    fn commit(&self, writes: Vec<Write>) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stamp {
    /// Entry did not exist when read.
    Absent,
    Committed(Version),
    /// Written earlier in the same unit of work.
    Staged(u64),
}

/// A value checked out of a unit of work for exactly one mutation.
///
/// Mutate it through `DerefMut`, then hand it back to
/// [`UnitOfWork::compare_and_swap`] (or remove it with
/// [`UnitOfWork::remove_if_version`]). It is bound to the unit of work that
/// produced it and cannot be cloned.
#[derive(Debug)]
pub struct Checkout<T> {
    value: T,
    pub(crate) stamp: Stamp,
    pub(crate) unit: u64,
}

impl<T> Checkout<T> {
    pub(crate) fn new(value: T, stamp: Stamp, unit: u64) -> Self {
        Self { value, stamp, unit }
    }

    /// Committed version this checkout is based on, if it was read from the
    /// store rather than from a staged write.
    pub fn version(&self) -> Option<Version> {
        match self.stamp {
            Stamp::Committed(v) => Some(v),
            Stamp::Absent | Stamp::Staged(_) => None,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T> Deref for Checkout<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Checkout<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}
