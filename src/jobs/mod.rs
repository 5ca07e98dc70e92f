// src/jobs/mod.rs

//! Side-effect jobs emitted by state transitions.
//!
//! A [`Job`] is a closed set of variants; each one carries [`JobMeta`]
//! describing when it runs relative to the emitting transaction
//! ([`Phase`]), whether it may leave the caller's thread, whether its
//! failure is swallowed, and which transaction it runs in
//! ([`Propagation`]). [`JobScheduler`] routes jobs onto the transaction's
//! hooks and executes them with an exhaustive match.

mod invoke;
pub mod scheduler;

use crate::model::{Task, TaskId};
use crate::types::Transition;

pub use scheduler::JobScheduler;

/// When a job runs relative to the transaction that emitted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Immediately, inside the open transaction. Failure aborts it.
    InProgress,
    /// Just before commit, joined to the transaction.
    BeforeCompletion,
    /// Only after the transaction has durably committed.
    AfterSuccess,
}

/// Which transaction a job's own store work happens in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// The job does no store work of its own, or opens its own transactions.
    Unbound,
    Join,
    RequiresNew,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobMeta {
    pub phase: Phase,
    pub is_async: bool,
    pub tolerant: bool,
    pub propagation: Propagation,
}

impl JobMeta {
    const fn in_progress() -> Self {
        Self {
            phase: Phase::InProgress,
            is_async: false,
            tolerant: false,
            propagation: Propagation::Join,
        }
    }

    const fn remote() -> Self {
        Self {
            phase: Phase::AfterSuccess,
            is_async: true,
            tolerant: false,
            propagation: Propagation::Unbound,
        }
    }
}

/// What a finished dependency tells its dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencySignal {
    Succeeded,
    Stopped,
    Cancelled,
}

#[derive(Debug, Clone)]
pub enum Job {
    /// Call the worker's start endpoint and report the answer.
    InvokeStart { task: Task },
    /// Call the worker's stop endpoint; failure to stop fails the task.
    InvokeStop { task: Task },
    NotifyDependents {
        signal: DependencySignal,
        task: TaskId,
        dependents: Vec<TaskId>,
    },
    /// Give back the admission slot held by `task`.
    ReleaseSlot { task: TaskId },
    /// Admit as many ENQUEUED tasks as the ceiling allows.
    PokeQueue,
    /// Tell the submitter about a transition, if it asked to be told.
    NotifyCaller { transition: Transition, task: Task },
    Delete { task: TaskId },
    /// `task` was deleted; drop it from the dependents of `dependencies`.
    DependantDeleted {
        task: TaskId,
        dependencies: Vec<TaskId>,
    },
    /// Run `job` with different metadata.
    Delegate { meta: JobMeta, job: Box<Job> },
    /// Run `then` only if `first` succeeded. `then` is routed by its own metadata.
    Chained { first: Box<Job>, then: Box<Job> },
}

impl Job {
    pub fn meta(&self) -> JobMeta {
        match self {
            Job::InvokeStart { .. } | Job::InvokeStop { .. } | Job::NotifyCaller { .. } => {
                JobMeta::remote()
            }
            Job::PokeQueue => JobMeta {
                phase: Phase::AfterSuccess,
                is_async: false,
                tolerant: true,
                propagation: Propagation::Unbound,
            },
            Job::NotifyDependents { .. }
            | Job::ReleaseSlot { .. }
            | Job::Delete { .. }
            | Job::DependantDeleted { .. } => JobMeta::in_progress(),
            Job::Delegate { meta, .. } => *meta,
            Job::Chained { first, .. } => first.meta(),
        }
    }

    /// Delete `task` atomically with the transition that finished it.
    pub fn delete_before_commit(task: impl Into<TaskId>) -> Job {
        Job::Delegate {
            meta: JobMeta {
                phase: Phase::BeforeCompletion,
                is_async: false,
                tolerant: false,
                propagation: Propagation::Join,
            },
            job: Box::new(Job::Delete { task: task.into() }),
        }
    }

    /// Delete `task` in its own transaction once `first` has succeeded.
    /// A failed deletion does not undo `first`.
    pub fn delete_after(first: Job, task: impl Into<TaskId>) -> Job {
        let delete = Job::Delegate {
            meta: JobMeta {
                phase: Phase::InProgress,
                is_async: false,
                tolerant: true,
                propagation: Propagation::RequiresNew,
            },
            job: Box::new(Job::Delete { task: task.into() }),
        };
        Job::Chained {
            first: Box::new(first),
            then: Box::new(delete),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Job::InvokeStart { .. } => "invoke-start",
            Job::InvokeStop { .. } => "invoke-stop",
            Job::NotifyDependents { signal, .. } => match signal {
                DependencySignal::Succeeded => "notify-dependents-succeeded",
                DependencySignal::Stopped => "notify-dependents-dependency-failed",
                DependencySignal::Cancelled => "notify-dependents-cancelled",
            },
            Job::ReleaseSlot { .. } => "release-slot",
            Job::PokeQueue => "poke-queue",
            Job::NotifyCaller { .. } => "notify-caller",
            Job::Delete { .. } => "delete",
            Job::DependantDeleted { .. } => "dependant-deleted",
            Job::Delegate { job, .. } => job.name(),
            Job::Chained { first, .. } => first.name(),
        }
    }

    /// Task the job acts for, if any.
    pub fn task(&self) -> Option<&str> {
        match self {
            Job::InvokeStart { task } | Job::InvokeStop { task } => Some(&task.name),
            Job::NotifyCaller { task, .. } => Some(&task.name),
            Job::NotifyDependents { task, .. }
            | Job::ReleaseSlot { task }
            | Job::Delete { task }
            | Job::DependantDeleted { task, .. } => Some(task),
            Job::PokeQueue => None,
            Job::Delegate { job, .. } => job.task(),
            Job::Chained { first, .. } => first.task(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascades_run_inside_the_transaction() {
        let job = Job::NotifyDependents {
            signal: DependencySignal::Succeeded,
            task: "x".into(),
            dependents: vec!["y".into()],
        };
        assert_eq!(job.meta(), JobMeta::in_progress());
        assert_eq!(Job::ReleaseSlot { task: "x".into() }.meta().phase, Phase::InProgress);
    }

    #[test]
    fn queue_poke_waits_for_commit_and_is_tolerant() {
        let meta = Job::PokeQueue.meta();
        assert_eq!(meta.phase, Phase::AfterSuccess);
        assert!(meta.tolerant);
        assert!(!meta.is_async);
    }

    #[test]
    fn immediate_delete_joins_the_commit() {
        let meta = Job::delete_before_commit("x").meta();
        assert_eq!(meta.phase, Phase::BeforeCompletion);
        assert_eq!(meta.propagation, Propagation::Join);
        assert!(!meta.tolerant);
    }

    #[test]
    fn chained_delete_takes_metadata_from_the_first_job() {
        let first = Job::PokeQueue;
        let chained = Job::delete_after(first, "x");
        assert_eq!(chained.meta(), Job::PokeQueue.meta());
        assert_eq!(chained.name(), "poke-queue");

        let Job::Chained { then, .. } = chained else {
            panic!("expected a chain");
        };
        let follow_up = then.meta();
        assert_eq!(follow_up.propagation, Propagation::RequiresNew);
        assert!(follow_up.tolerant);
        assert_eq!(then.task(), Some("x"));
    }
}
