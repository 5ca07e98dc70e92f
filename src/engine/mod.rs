// src/engine/mod.rs

//! Shared runtime context for the scheduler.
//!
//! An [`Engine`] bundles the versioned store, the remote invoker and the
//! scheduler options, and drives transactions:
//! - [`Engine::in_transaction`] runs a closure against a fresh
//!   [`Transaction`], drains before-completion jobs into the same unit of
//!   work, commits, and only then dispatches after-success jobs.
//! - Component handles ([`Engine::controller`], [`Engine::installer`],
//!   [`Engine::admission`], [`Engine::jobs`]) borrow the engine so jobs can
//!   call back into the controller while a transaction is open.
//!
//! Without a tokio runtime handle every after-success job runs inline on the
//! committing thread once the commit is durable. With one, async jobs go to
//! `spawn_blocking`.

pub mod retry;
pub mod transaction;

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use crate::admission::Admission;
use crate::config::ConfigFile;
use crate::controller::TaskController;
use crate::errors::Result;
use crate::installer::GraphInstaller;
use crate::jobs::JobScheduler;
use crate::remote::RemoteInvoker;
use crate::store::{UnitOfWork, VersionedStore};

pub use retry::retry_on_conflict;
pub use transaction::Transaction;

/// Scheduler options shared by every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Deployment identity, included in caller notifications.
    pub deployment: String,
    /// Base URL the workers use to call back.
    pub base_url: String,
    /// Delete finished tasks once nothing depends on them.
    pub clean: bool,
    /// Upper bound on ENQUEUED tasks fetched per queue poke.
    pub queue_page_size: usize,
    /// Attempts for internal operations that lose an optimistic race
    /// (queue pokes, reports from remote jobs).
    pub internal_attempts: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            deployment: "rex".to_string(),
            base_url: "http://localhost:8080".to_string(),
            clean: true,
            queue_page_size: 100,
            internal_attempts: 5,
        }
    }
}

impl EngineOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            deployment: cfg.scheduler.name.clone(),
            base_url: cfg.scheduler.base_url.trim_end_matches('/').to_string(),
            clean: cfg.scheduler.clean,
            queue_page_size: cfg.admission.queue_page_size,
            internal_attempts: cfg.retry.internal_attempts,
        }
    }

    /// URL a worker calls to report the outcome of `task`.
    pub fn callback_url(&self, task: &str) -> String {
        format!("{}/rest/internal/{task}/finish", self.base_url)
    }
}

struct Inner {
    store: Arc<dyn VersionedStore>,
    invoker: Arc<dyn RemoteInvoker>,
    options: EngineOptions,
    runtime: Option<Handle>,
}

/// Cheap to clone; every clone shares the same store and invoker.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.inner.store)
            .field("options", &self.inner.options)
            .field("on_runtime", &self.inner.runtime.is_some())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Engine that runs after-success jobs inline after each commit.
    pub fn new(
        store: Arc<dyn VersionedStore>,
        invoker: Arc<dyn RemoteInvoker>,
        options: EngineOptions,
    ) -> Self {
        Self::build(store, invoker, options, None)
    }

    /// Engine that hands async jobs to the blocking pool of `runtime`.
    pub fn on_runtime(
        store: Arc<dyn VersionedStore>,
        invoker: Arc<dyn RemoteInvoker>,
        options: EngineOptions,
        runtime: Handle,
    ) -> Self {
        Self::build(store, invoker, options, Some(runtime))
    }

    fn build(
        store: Arc<dyn VersionedStore>,
        invoker: Arc<dyn RemoteInvoker>,
        options: EngineOptions,
        runtime: Option<Handle>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                invoker,
                options,
                runtime,
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn VersionedStore> {
        &self.inner.store
    }

    pub fn invoker(&self) -> &dyn RemoteInvoker {
        self.inner.invoker.as_ref()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.inner.options
    }

    pub(crate) fn runtime(&self) -> Option<&Handle> {
        self.inner.runtime.as_ref()
    }

    pub fn controller(&self) -> TaskController<'_> {
        TaskController::new(self)
    }

    pub fn installer(&self) -> GraphInstaller<'_> {
        GraphInstaller::new(self)
    }

    pub fn admission(&self) -> Admission<'_> {
        Admission::new(self)
    }

    pub fn jobs(&self) -> JobScheduler<'_> {
        JobScheduler::new(self)
    }

    /// Open a new transaction. Dropping it without [`Engine::commit`] rolls
    /// back every staged write and discards every deferred job.
    pub fn begin(&self) -> Transaction {
        Transaction::new(UnitOfWork::new(Arc::clone(&self.inner.store)))
    }

    /// Run before-completion jobs, commit, then dispatch after-success jobs.
    pub fn commit(&self, mut tx: Transaction) -> Result<()> {
        let jobs = self.jobs();
        while let Some(job) = tx.next_before_completion() {
            jobs.run_before_completion(&mut tx, job)?;
        }

        let (work, after_success) = tx.into_parts();
        let unit = work.id();
        work.commit()?;
        debug!(unit, after_success = after_success.len(), "transaction committed");

        for job in after_success {
            jobs.after_commit(job);
        }
        Ok(())
    }

    /// Run `f` inside a fresh transaction and commit it if `f` succeeds.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&mut Transaction) -> Result<T>) -> Result<T> {
        let mut tx = self.begin();
        let out = f(&mut tx)?;
        self.commit(tx)?;
        Ok(out)
    }
}
