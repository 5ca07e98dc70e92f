// src/jobs/scheduler.rs

use tracing::{debug, error, warn};

use crate::engine::{Engine, Transaction};
use crate::errors::{Result, RexError};
use crate::jobs::{invoke, DependencySignal, Job, JobMeta, Phase, Propagation};

/// Routes jobs onto the hooks of the current transaction and executes them.
///
/// - in-progress: run now, in the open transaction (or a new one for
///   `RequiresNew`)
/// - before-completion: queued on the transaction, run by the commit driver
/// - after-success: queued on the transaction, dispatched after commit
pub struct JobScheduler<'a> {
    engine: &'a Engine,
}

impl<'a> JobScheduler<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Route a job emitted while `tx` is open.
    pub fn schedule(&self, tx: &mut Transaction, job: Job) -> Result<()> {
        let meta = job.meta();
        debug!(job = job.name(), task = ?job.task(), phase = ?meta.phase, "scheduling job");

        match meta.phase {
            Phase::InProgress => {
                let result = match meta.propagation {
                    Propagation::RequiresNew => self
                        .engine
                        .in_transaction(|inner| self.execute(Some(inner), &job)),
                    Propagation::Join | Propagation::Unbound => self.execute(Some(tx), &job),
                };
                settle(&job, meta, result)
            }
            Phase::BeforeCompletion => {
                tx.defer_before_completion(job);
                Ok(())
            }
            Phase::AfterSuccess => {
                tx.defer_after_success(job);
                Ok(())
            }
        }
    }

    pub(crate) fn run_before_completion(&self, tx: &mut Transaction, job: Job) -> Result<()> {
        let meta = job.meta();
        let result = self.execute(Some(tx), &job);
        settle(&job, meta, result)
    }

    /// Dispatch a job whose transaction has committed.
    pub(crate) fn after_commit(&self, job: Job) {
        if job.meta().is_async {
            if let Some(runtime) = self.engine.runtime() {
                let engine = self.engine.clone();
                runtime.spawn_blocking(move || engine.jobs().run_detached(job));
                return;
            }
        }
        self.run_detached(job);
    }

    /// Run a job with no transaction open on this thread. Failures can no
    /// longer abort anything, so they are only logged.
    fn run_detached(&self, job: Job) {
        let meta = job.meta();
        let result = match meta.propagation {
            Propagation::Unbound => self.execute(None, &job),
            Propagation::Join | Propagation::RequiresNew => self
                .engine
                .in_transaction(|tx| self.execute(Some(tx), &job)),
        };
        if let Err(err) = settle(&job, meta, result) {
            error!(job = job.name(), task = ?job.task(), error = %err, "post-commit job failed");
        }
    }

    fn execute(&self, tx: Option<&mut Transaction>, job: &Job) -> Result<()> {
        match job {
            Job::InvokeStart { task } => invoke::start(self.engine, task),
            Job::InvokeStop { task } => invoke::stop(self.engine, task),
            Job::NotifyCaller { transition, task } => {
                invoke::notify_caller(self.engine, *transition, task)
            }
            Job::NotifyDependents {
                signal, dependents, ..
            } => {
                let tx = bound(tx, job)?;
                let controller = self.engine.controller();
                for dependent in dependents {
                    match signal {
                        DependencySignal::Succeeded => {
                            controller.dependency_succeeded(tx, dependent)?
                        }
                        DependencySignal::Stopped => controller.dependency_stopped(tx, dependent)?,
                        DependencySignal::Cancelled => {
                            controller.dependency_cancelled(tx, dependent)?
                        }
                    }
                }
                Ok(())
            }
            Job::ReleaseSlot { .. } => self.engine.admission().release(bound(tx, job)?),
            Job::PokeQueue => self.engine.admission().poke().map(|_| ()),
            Job::Delete { task } => self.engine.controller().delete(bound(tx, job)?, task),
            Job::DependantDeleted { task, dependencies } => {
                let tx = bound(tx, job)?;
                let controller = self.engine.controller();
                for dependency in dependencies {
                    controller.dependant_deleted(tx, dependency, task)?;
                }
                Ok(())
            }
            Job::Delegate { job: inner, .. } => self.execute(tx, inner),
            Job::Chained { first, then } => match tx {
                Some(tx) => {
                    self.execute(Some(&mut *tx), first)?;
                    self.schedule(tx, (**then).clone())
                }
                None => {
                    self.execute(None, first)?;
                    self.run_detached((**then).clone());
                    Ok(())
                }
            },
        }
    }
}

fn settle(job: &Job, meta: JobMeta, result: Result<()>) -> Result<()> {
    match result {
        Err(err) if meta.tolerant => {
            warn!(job = job.name(), task = ?job.task(), error = %err, "tolerant job failed; ignoring");
            Ok(())
        }
        other => other,
    }
}

fn bound<'t>(tx: Option<&'t mut Transaction>, job: &Job) -> Result<&'t mut Transaction> {
    tx.ok_or_else(|| {
        RexError::IllegalState(format!("job {} needs an open transaction", job.name()))
    })
}
