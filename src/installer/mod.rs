// src/installer/mod.rs

//! Graph installation: merge a submitted graph of new and existing tasks
//! into the store.
//!
//! Runs entirely inside the caller's transaction:
//! 1. resolve every edge endpoint into a working set (new tasks from their
//!    templates, existing ones checked out of the store),
//! 2. link dependencies and dependents,
//! 3. stage inserts and CAS write-backs,
//! 4. search the merged graph for loops,
//! 5. activate new ACTIVE tasks and ask for a queue poke after commit.
//!
//! Any failure leaves the transaction to be rolled back in full.

pub mod cycle;

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::engine::{Engine, Transaction};
use crate::errors::{Result, RexError};
use crate::jobs::Job;
use crate::model::{Task, TaskGraph, TaskId};
use crate::store::Checkout;
use crate::types::Mode;

pub use cycle::find_cycle;

enum Staged {
    New(Task),
    Existing(Checkout<Task>),
}

impl Staged {
    fn task(&self) -> &Task {
        match self {
            Staged::New(task) => task,
            Staged::Existing(checkout) => &**checkout,
        }
    }

    fn task_mut(&mut self) -> &mut Task {
        match self {
            Staged::New(task) => task,
            Staged::Existing(checkout) => &mut **checkout,
        }
    }
}

pub struct GraphInstaller<'a> {
    engine: &'a Engine,
}

impl<'a> GraphInstaller<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Install `graph` and return the newly created tasks as they stand at
    /// the end of the install.
    pub fn install(&self, tx: &mut Transaction, graph: &TaskGraph) -> Result<Vec<Task>> {
        let mut working: BTreeMap<TaskId, Staged> = BTreeMap::new();

        for edge in &graph.edges {
            if edge.dependent == edge.dependency {
                return Err(RexError::SelfDependency(edge.dependent.clone()));
            }
            resolve(tx, graph, &mut working, &edge.dependent)?;
            resolve(tx, graph, &mut working, &edge.dependency)?;
            link(&mut working, &edge.dependent, &edge.dependency)?;
        }

        for (id, template) in &graph.vertices {
            working
                .entry(id.clone())
                .or_insert_with(|| Staged::New(Task::from_template(id.clone(), template)));
        }

        let mut created: Vec<(TaskId, Mode)> = Vec::new();
        let roots: Vec<TaskId> = working.keys().cloned().collect();
        for (id, staged) in working {
            match staged {
                Staged::New(task) => {
                    created.push((id, task.mode));
                    tx.insert_if_absent(task)?;
                }
                Staged::Existing(checkout) => tx.compare_and_swap(checkout)?,
            }
        }

        let loop_path = find_cycle(roots, |id| {
            Ok(tx
                .peek_task(id)?
                .map(|t| t.dependencies.into_iter().collect())
                .unwrap_or_default())
        })?;
        if let Some(path) = loop_path {
            let on = path.last().cloned().unwrap_or_default();
            return Err(RexError::Cycle(format!(
                "Cycle has been found on task {on} with loop: {}",
                path.join("->")
            )));
        }

        let controller = self.engine.controller();
        for (id, mode) in &created {
            if *mode == Mode::Active {
                controller.set_mode(tx, id, Mode::Active)?;
            }
        }

        self.engine.jobs().schedule(tx, Job::PokeQueue)?;

        info!(created = created.len(), edges = graph.edges.len(), "graph installed");
        let mut tasks = Vec::with_capacity(created.len());
        for (id, _) in created {
            if let Some(task) = tx.peek_task(&id)? {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }
}

/// Put `id` into the working set: from the submitted templates if declared
/// new, otherwise checked out of the store.
fn resolve(
    tx: &mut Transaction,
    graph: &TaskGraph,
    working: &mut BTreeMap<TaskId, Staged>,
    id: &str,
) -> Result<()> {
    if working.contains_key(id) {
        return Ok(());
    }
    let staged = match graph.vertices.get(id) {
        Some(template) => Staged::New(Task::from_template(id, template)),
        None => match tx.get_task(id)? {
            Some(checkout) => Staged::Existing(checkout),
            None => {
                return Err(RexError::BadRequest(format!(
                    "Either existing task {id} has incorrect identifier or data for a new task is not declared in vertices"
                )));
            }
        },
    };
    working.insert(id.to_string(), staged);
    Ok(())
}

/// Record `dependent -> dependency` on both tasks. Re-adding an existing
/// edge changes nothing.
fn link(working: &mut BTreeMap<TaskId, Staged>, dependent: &str, dependency: &str) -> Result<()> {
    let dependency_final = working
        .get(dependency)
        .map(|s| s.task().state.is_final())
        .unwrap_or(false);

    if let Some(staged) = working.get_mut(dependent) {
        let task = staged.task_mut();
        if !task.state.is_idle() {
            return Err(RexError::Conflict(format!(
                "Task {dependent} is in state {} and cannot take new dependencies",
                task.state
            )));
        }
        if task.dependencies.insert(dependency.to_string()) {
            if !dependency_final {
                task.unfinished_dependencies += 1;
            }
            debug!(%dependent, %dependency, "dependency linked");
        }
    }

    if let Some(staged) = working.get_mut(dependency) {
        staged.task_mut().dependents.insert(dependent.to_string());
    }
    Ok(())
}
