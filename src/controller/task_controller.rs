// src/controller/task_controller.rs

use serde_json::Value;
use tracing::{debug, info};

use crate::controller::transitions;
use crate::engine::{Engine, Transaction};
use crate::errors::{Result, RexError};
use crate::jobs::Job;
use crate::model::Task;
use crate::store::Checkout;
use crate::types::{Mode, State, StopFlag};

/// Entry points of the task state machine.
///
/// Every call runs inside the caller's transaction. It reads the task,
/// applies its own mutation, evaluates the guard table, writes back with the
/// version it read and then schedules the emitted jobs. A lost race surfaces
/// as [`RexError::ConcurrentUpdate`] and the whole operation has to be
/// replayed.
pub struct TaskController<'a> {
    engine: &'a Engine,
}

impl<'a> TaskController<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Change the client mode. Mode only tightens: IDLE -> ACTIVE -> CANCEL.
    pub fn set_mode(&self, tx: &mut Transaction, id: &str, mode: Mode) -> Result<()> {
        self.change_mode(tx, id, mode, false)
    }

    /// Like [`set_mode`](Self::set_mode), and re-evaluate the admission queue
    /// after commit.
    pub fn set_mode_and_poke(&self, tx: &mut Transaction, id: &str, mode: Mode) -> Result<()> {
        self.change_mode(tx, id, mode, true)
    }

    fn change_mode(&self, tx: &mut Transaction, id: &str, mode: Mode, poke: bool) -> Result<()> {
        let mut task = tx.require_task(id)?;
        match (task.mode, mode) {
            (Mode::Cancel, Mode::Cancel) => {
                debug!(task = %id, "task is already cancelled");
                return Ok(());
            }
            (Mode::Cancel, _) | (Mode::Active, Mode::Idle) => {
                return Err(RexError::InvalidModeChange {
                    task: id.to_string(),
                    from: task.mode,
                    to: mode,
                });
            }
            _ => {}
        }

        task.mode = mode;
        if mode == Mode::Cancel {
            task.stop_flag = StopFlag::Cancelled;
        }
        let extra = if poke { vec![Job::PokeQueue] } else { Vec::new() };
        self.handle(tx, task, extra)
    }

    /// Positive report from the worker.
    pub fn accept(&self, tx: &mut Transaction, id: &str, response: Value) -> Result<()> {
        let mut task = tx.require_task(id)?;
        ensure_reporting_state(&task, "accept")?;
        task.push_response(true, response);
        self.handle(tx, task, Vec::new())
    }

    /// Negative report from the worker, or a failed remote call.
    pub fn fail(&self, tx: &mut Transaction, id: &str, response: Value) -> Result<()> {
        let mut task = tx.require_task(id)?;
        ensure_reporting_state(&task, "fail")?;
        task.stop_flag = StopFlag::Unsuccessful;
        task.push_response(false, response);
        self.handle(tx, task, Vec::new())
    }

    /// Admit an ENQUEUED task. The caller has already taken its slot.
    pub fn dequeue(&self, tx: &mut Transaction, id: &str) -> Result<()> {
        let mut task = tx.require_task(id)?;
        if task.state != State::Enqueued {
            return Err(RexError::IllegalState(format!(
                "Task {id} cannot be dequeued in state {}",
                task.state
            )));
        }
        task.starting = true;
        self.handle(tx, task, Vec::new())
    }

    pub fn dependency_succeeded(&self, tx: &mut Transaction, id: &str) -> Result<()> {
        let mut task = tx.require_task(id)?;
        task.unfinished_dependencies -= 1;
        self.handle(tx, task, Vec::new())
    }

    pub fn dependency_stopped(&self, tx: &mut Transaction, id: &str) -> Result<()> {
        let mut task = tx.require_task(id)?;
        task.stop_flag = StopFlag::DependencyFailed;
        self.handle(tx, task, Vec::new())
    }

    pub fn dependency_cancelled(&self, tx: &mut Transaction, id: &str) -> Result<()> {
        let mut task = tx.require_task(id)?;
        task.stop_flag = StopFlag::Cancelled;
        self.handle(tx, task, Vec::new())
    }

    /// `deleted` no longer exists; forget it. A finished task left without
    /// dependents is collected as well when cleanup is on.
    pub fn dependant_deleted(&self, tx: &mut Transaction, id: &str, deleted: &str) -> Result<()> {
        // may already be gone in this same transaction
        let Some(mut task) = tx.get_task(id)? else {
            debug!(task = %id, dependant = %deleted, "dependency already deleted");
            return Ok(());
        };

        task.dependents.remove(deleted);
        let collect =
            self.engine.options().clean && task.state.is_final() && task.dependents.is_empty();
        tx.compare_and_swap(task)?;

        if collect {
            self.engine.jobs().schedule(tx, Job::Delete { task: id.to_string() })?;
        }
        Ok(())
    }

    /// Remove a finished task that nothing depends on any more.
    pub fn delete(&self, tx: &mut Transaction, id: &str) -> Result<()> {
        let task = tx.require_task(id)?;
        if !task.state.is_final() {
            return Err(RexError::IllegalState(format!(
                "Task {id} cannot be deleted in state {}",
                task.state
            )));
        }
        if !task.dependents.is_empty() {
            return Err(RexError::IllegalState(format!(
                "Task {id} still has dependents {:?}",
                task.dependents
            )));
        }

        let dependencies: Vec<String> = task.dependencies.iter().cloned().collect();
        tx.remove_if_version(task)?;
        info!(task = %id, "task deleted");

        if dependencies.is_empty() {
            return Ok(());
        }
        self.engine.jobs().schedule(
            tx,
            Job::DependantDeleted {
                task: id.to_string(),
                dependencies,
            },
        )
    }

    fn handle(&self, tx: &mut Transaction, mut task: Checkout<Task>, extra: Vec<Job>) -> Result<()> {
        let step = transitions::advance(&mut task, self.engine.options().clean);
        let name = task.name.clone();
        tx.compare_and_swap(task)?;

        let mut jobs = Vec::new();
        if let Some(step) = step {
            info!(task = %name, transition = %step.transition, "task transitioned");
            jobs = step.jobs;
        }
        jobs.extend(extra);

        let scheduler = self.engine.jobs();
        for job in jobs {
            scheduler.schedule(tx, job)?;
        }
        Ok(())
    }
}

fn ensure_reporting_state(task: &Task, operation: &str) -> Result<()> {
    if task.state.is_running() {
        Ok(())
    } else {
        Err(RexError::IllegalState(format!(
            "Task {} cannot {operation} a remote response in state {}",
            task.name, task.state
        )))
    }
}
