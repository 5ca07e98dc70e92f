mod common;
use crate::common::{start_uri, GraphBuilder, Harness, TestResult};

use serde_json::Value;

use rex_scheduler::engine::EngineOptions;
use rex_scheduler::types::State;

fn three_independent() -> rex_scheduler::model::TaskGraph {
    GraphBuilder::new().active("a").active("b").active("c").build()
}

#[test]
fn ceiling_bounds_running_tasks() -> TestResult {
    let h = Harness::with_max_concurrent(1);
    h.service.submit(&three_independent())?;

    assert_eq!(h.state("a"), Some(State::Up));
    assert_eq!(h.state("b"), Some(State::Enqueued));
    assert_eq!(h.state("c"), Some(State::Enqueued));
    assert_eq!(h.running(), 1);
    assert_eq!(h.invoker.called_uris(), vec![start_uri("a")]);

    h.service.finish("a", true, Value::Null)?;

    assert!(h.task("a").is_none());
    assert_eq!(h.state("b"), Some(State::Up));
    assert_eq!(h.state("c"), Some(State::Enqueued));
    assert_eq!(h.running(), 1);
    Ok(())
}

#[test]
fn raising_the_ceiling_admits_queued_tasks() -> TestResult {
    let h = Harness::with_max_concurrent(0);
    h.service.submit(&three_independent())?;
    assert_eq!(h.running(), 0);
    assert_eq!(h.service.concurrency()?, 0);
    assert!(h.invoker.calls().is_empty());

    h.service.set_concurrency(2)?;

    assert_eq!(h.service.concurrency()?, 2);
    assert_eq!(h.state("a"), Some(State::Up));
    assert_eq!(h.state("b"), Some(State::Up));
    assert_eq!(h.state("c"), Some(State::Enqueued));
    assert_eq!(h.running(), 2);
    Ok(())
}

#[test]
fn lowering_the_ceiling_does_not_stop_running_tasks() -> TestResult {
    let h = Harness::with_max_concurrent(2);
    h.service.submit(&three_independent())?;

    h.service.set_concurrency(1)?;
    assert_eq!(h.running(), 2);

    h.service.finish("a", true, Value::Null)?;
    // 1 running, ceiling 1: nothing new admitted
    assert_eq!(h.state("c"), Some(State::Enqueued));
    assert_eq!(h.running(), 1);
    Ok(())
}

#[test]
fn cancelling_a_queued_task_takes_no_slot() -> TestResult {
    let h = Harness::with_options(
        EngineOptions {
            clean: false,
            ..EngineOptions::default()
        },
        1,
    );
    h.service.submit(&three_independent())?;

    h.service.cancel("b")?;

    assert_eq!(h.state("b"), Some(State::Stopped));
    assert_eq!(h.running(), 1);
    Ok(())
}

#[test]
fn failed_start_frees_the_slot_for_the_next_task() -> TestResult {
    let h = Harness::with_max_concurrent(1);
    h.invoker.respond(&start_uri("a"), 500, Value::Null);

    h.service.submit(&three_independent())?;

    assert!(h.task("a").is_none());
    assert_eq!(h.state("b"), Some(State::Up));
    assert_eq!(h.state("c"), Some(State::Enqueued));
    assert_eq!(h.running(), 1);
    Ok(())
}
