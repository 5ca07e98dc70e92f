// src/admission/mod.rs

//! Admission control.
//!
//! Two counters live in the versioned store next to the tasks:
//! `running` (tasks holding a slot) and `max-concurrent` (the ceiling). Both
//! are only ever changed through CAS inside a transaction, so several
//! scheduler instances sharing one store stay within the ceiling. A lost race
//! is resolved by replaying the transaction, never by locking.

use tracing::{debug, info, warn};

use crate::engine::{retry_on_conflict, Engine, Transaction};
use crate::errors::Result;
use crate::jobs::Job;
use crate::model::TaskId;
use crate::store::CounterKey;
use crate::types::State;

pub struct Admission<'a> {
    engine: &'a Engine,
}

impl<'a> Admission<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Set the ceiling and create `running` if this store has never seen it.
    pub fn initialize(&self, tx: &mut Transaction, max_concurrent: u64) -> Result<()> {
        let mut max = tx.get_counter(CounterKey::MaxConcurrent)?;
        *max = max_concurrent;
        tx.compare_and_swap_counter(CounterKey::MaxConcurrent, max)?;

        let running = tx.get_counter(CounterKey::Running)?;
        if running.version().is_none() {
            tx.compare_and_swap_counter(CounterKey::Running, running)?;
        }
        debug!(max_concurrent, "admission counters initialised");
        Ok(())
    }

    pub fn max_concurrent(&self, tx: &mut Transaction) -> Result<u64> {
        Ok(*tx.get_counter(CounterKey::MaxConcurrent)?)
    }

    pub fn running(&self, tx: &mut Transaction) -> Result<u64> {
        Ok(*tx.get_counter(CounterKey::Running)?)
    }

    /// Change the ceiling at runtime. A raised ceiling admits queued tasks
    /// once the change commits.
    pub fn set_max_concurrent(&self, tx: &mut Transaction, amount: u64) -> Result<()> {
        let mut max = tx.get_counter(CounterKey::MaxConcurrent)?;
        let previous = *max;
        *max = amount;
        tx.compare_and_swap_counter(CounterKey::MaxConcurrent, max)?;
        info!(previous, amount, "concurrency ceiling changed");
        self.engine.jobs().schedule(tx, Job::PokeQueue)
    }

    /// Give back one slot. Runs in the transaction that finished the task.
    pub fn release(&self, tx: &mut Transaction) -> Result<()> {
        let mut running = tx.get_counter(CounterKey::Running)?;
        if *running == 0 {
            warn!("releasing an admission slot while none is taken");
            return Ok(());
        }
        *running -= 1;
        tx.compare_and_swap_counter(CounterKey::Running, running)
    }

    /// Admit queued tasks in a fresh transaction, replayed on contention.
    /// Returns how many tasks were admitted.
    pub fn poke(&self) -> Result<usize> {
        retry_on_conflict("poke queue", self.engine.options().internal_attempts, || {
            self.engine.in_transaction(|tx| self.admit(tx))
        })
    }

    /// Take as many ENQUEUED tasks as fit under the ceiling, claim a slot
    /// for each and dequeue them.
    pub fn admit(&self, tx: &mut Transaction) -> Result<usize> {
        let max = *tx.get_counter(CounterKey::MaxConcurrent)?;
        let mut running = tx.get_counter(CounterKey::Running)?;
        let free = max.saturating_sub(*running);
        if free == 0 {
            debug!(max, running = *running, "no free admission slots");
            return Ok(0);
        }

        let page = self.engine.options().queue_page_size;
        let candidates: Vec<TaskId> = tx
            .query_tasks(&[State::Enqueued], Some(page))?
            .into_iter()
            .filter(|t| !t.starting)
            .take(usize::try_from(free).unwrap_or(usize::MAX))
            .map(|t| t.name)
            .collect();
        if candidates.is_empty() {
            return Ok(0);
        }

        *running += candidates.len() as u64;
        tx.compare_and_swap_counter(CounterKey::Running, running)?;

        let controller = self.engine.controller();
        for id in &candidates {
            controller.dequeue(tx, id)?;
        }
        info!(admitted = candidates.len(), max, "admitted queued tasks");
        Ok(candidates.len())
    }
}
