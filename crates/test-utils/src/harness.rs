use std::sync::Arc;

use rex_scheduler::engine::{Engine, EngineOptions};
use rex_scheduler::model::Task;
use rex_scheduler::service::TaskService;
use rex_scheduler::store::{CounterKey, MemoryStore, VersionedStore};
use rex_scheduler::types::State;

use crate::fake_invoker::FakeInvoker;

/// A scheduler wired to an in-memory store and a [`FakeInvoker`].
///
/// The engine has no runtime handle, so every post-commit job (remote
/// calls included) runs inline on the committing thread: when a service
/// call returns, the whole cascade it caused has settled.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub invoker: Arc<FakeInvoker>,
    pub service: TaskService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default(), 10)
    }

    pub fn with_max_concurrent(max_concurrent: u64) -> Self {
        Self::with_options(EngineOptions::default(), max_concurrent)
    }

    /// Finished tasks are kept instead of being collected.
    pub fn without_cleanup() -> Self {
        Self::with_options(
            EngineOptions {
                clean: false,
                ..EngineOptions::default()
            },
            10,
        )
    }

    pub fn with_options(options: EngineOptions, max_concurrent: u64) -> Self {
        crate::init_tracing();
        let store = Arc::new(MemoryStore::new());
        let invoker = Arc::new(FakeInvoker::new());
        let engine = Engine::new(store.clone(), invoker.clone(), options);
        let service = TaskService::new(engine, 15);
        service
            .initialize(max_concurrent)
            .expect("failed to initialise admission counters");
        Self {
            store,
            invoker,
            service,
        }
    }

    pub fn engine(&self) -> &Engine {
        self.service.engine()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.store
            .get_task(id)
            .expect("memory store reads do not fail")
            .map(|v| v.value)
    }

    pub fn state(&self, id: &str) -> Option<State> {
        self.task(id).map(|t| t.state)
    }

    /// Slots currently taken.
    pub fn running(&self) -> u64 {
        self.store
            .get_counter(CounterKey::Running)
            .expect("memory store reads do not fail")
            .map(|v| v.value)
            .unwrap_or(0)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
