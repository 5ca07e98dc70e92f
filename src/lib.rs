// src/lib.rs

pub mod admission;
pub mod cli;
pub mod config;
pub mod controller;
pub mod engine;
pub mod errors;
pub mod installer;
pub mod jobs;
pub mod logging;
pub mod model;
pub mod remote;
pub mod service;
pub mod store;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_graph, load_or_default, ConfigFile};
use crate::engine::{Engine, EngineOptions};
use crate::model::Task;
use crate::remote::http::{HttpInvoker, RetryPolicy};
use crate::service::TaskService;
use crate::store::MemoryStore;
use crate::types::{Mode, StateFilter};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - an in-memory store, the HTTP invoker and the engine
/// - installation of the submitted graph
///
/// Every vertex is installed IDLE, so no worker is contacted. The result is
/// the validated graph printed in an order that respects its edges.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    let mut graph = load_graph(&args.graph)
        .with_context(|| format!("loading graph {}", args.graph.display()))?;
    for template in graph.vertices.values_mut() {
        template.mode = Mode::Idle;
    }

    let service = build_service(&cfg, Handle::current());
    service.initialize(cfg.admission.max_concurrent)?;

    let installed = tokio::task::spawn_blocking(move || {
        service.submit(&graph)?;
        service.list(StateFilter::all())
    })
    .await??;
    info!(tasks = installed.len(), "graph installed");

    print_plan(&installed)
}

/// A service over an in-memory store that calls workers over HTTP.
pub fn build_service(cfg: &ConfigFile, runtime: Handle) -> TaskService {
    let retry = RetryPolicy {
        attempts: cfg.retry.remote_attempts,
        base_delay: Duration::from_millis(cfg.retry.remote_backoff_ms),
        ..RetryPolicy::default()
    };
    let invoker = HttpInvoker::new(Duration::from_secs(cfg.http.timeout_secs), retry);
    let engine = Engine::on_runtime(
        Arc::new(MemoryStore::new()),
        Arc::new(invoker),
        EngineOptions::from_config(cfg),
        runtime,
    );
    TaskService::new(engine, cfg.retry.concurrent_update_attempts)
}

/// Topological order of `tasks`, dependencies first. Ties follow identifier
/// order of insertion into the graph.
pub fn plan_order(tasks: &[Task]) -> Result<Vec<&str>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for task in tasks {
        graph.add_node(task.name.as_str());
    }
    for task in tasks {
        for dependency in &task.dependencies {
            graph.add_edge(dependency.as_str(), task.name.as_str(), ());
        }
    }
    toposort(&graph, None)
        .map_err(|cycle| anyhow::anyhow!("cycle through task {}", cycle.node_id()))
}

fn print_plan(tasks: &[Task]) -> Result<()> {
    let order = plan_order(tasks)?;
    println!("rex plan ({} tasks):", order.len());
    for (position, name) in order.iter().enumerate() {
        let Some(task) = tasks.iter().find(|t| t.name == *name) else {
            continue;
        };
        let admissible = if task.unfinished_dependencies <= 0 { "yes" } else { "no" };
        println!(
            "  {:>3}. {name} [{}] unfinished={} admissible={admissible}",
            position + 1,
            task.state,
            task.unfinished_dependencies
        );
        if !task.dependencies.is_empty() {
            let deps: Vec<&str> = task.dependencies.iter().map(String::as_str).collect();
            println!("       after: {}", deps.join(", "));
        }
        println!(
            "       start: {} {}",
            task.remote_start.method, task.remote_start.uri
        );
    }
    debug!("plan printed (no remote calls made)");
    Ok(())
}
