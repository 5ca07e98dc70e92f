// src/service.rs

//! Client-facing operations: submit a graph, query tasks, cancel, accept
//! worker callbacks, and tune the concurrency ceiling.
//!
//! Each mutating call is one transaction, replayed from scratch when it
//! loses an optimistic race.

use serde_json::Value;
use tracing::info;

use crate::engine::{retry_on_conflict, Engine};
use crate::errors::{Result, RexError};
use crate::model::{Task, TaskGraph};
use crate::types::{Mode, StateFilter};

#[derive(Debug, Clone)]
pub struct TaskService {
    engine: Engine,
    attempts: u32,
}

impl TaskService {
    /// `attempts` bounds how often a call is replayed after a concurrent update.
    pub fn new(engine: Engine, attempts: u32) -> Self {
        Self { engine, attempts }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Seed the admission counters. Call once per process before serving.
    pub fn initialize(&self, max_concurrent: u64) -> Result<()> {
        self.engine
            .in_transaction(|tx| self.engine.admission().initialize(tx, max_concurrent))
    }

    /// Create new tasks and/or extend the existing graph.
    pub fn submit(&self, graph: &TaskGraph) -> Result<Vec<Task>> {
        retry_on_conflict("submit graph", self.attempts, || {
            self.engine
                .in_transaction(|tx| self.engine.installer().install(tx, graph))
        })
    }

    pub fn list(&self, filter: StateFilter) -> Result<Vec<Task>> {
        let states = filter.states();
        if states.is_empty() {
            return Ok(Vec::new());
        }
        self.engine.store().query_tasks(&states, None)
    }

    pub fn get(&self, id: &str) -> Result<Task> {
        self.engine
            .store()
            .get_task(id)?
            .map(|v| v.value)
            .ok_or_else(|| RexError::TaskMissing(format!("Task {id} was not found.")))
    }

    pub fn cancel(&self, id: &str) -> Result<()> {
        info!(task = %id, "cancel requested");
        retry_on_conflict("cancel task", self.attempts, || {
            self.engine
                .in_transaction(|tx| self.engine.controller().set_mode(tx, id, Mode::Cancel))
        })
    }

    /// Worker callback: `positive` maps to `accept`, otherwise `fail`.
    pub fn finish(&self, id: &str, positive: bool, response: Value) -> Result<()> {
        retry_on_conflict("finish task", self.attempts, || {
            self.engine.in_transaction(|tx| {
                let controller = self.engine.controller();
                if positive {
                    controller.accept(tx, id, response.clone())
                } else {
                    controller.fail(tx, id, response.clone())
                }
            })
        })
    }

    pub fn set_concurrency(&self, amount: u64) -> Result<()> {
        retry_on_conflict("set concurrency", self.attempts, || {
            self.engine
                .in_transaction(|tx| self.engine.admission().set_max_concurrent(tx, amount))
        })
    }

    pub fn concurrency(&self) -> Result<u64> {
        let mut tx = self.engine.begin();
        self.engine.admission().max_concurrent(&mut tx)
    }
}
