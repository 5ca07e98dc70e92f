mod common;
use crate::common::{set, GraphBuilder, Harness, TestResult};

use rex_scheduler::errors::RexError;
use rex_scheduler::types::State;

#[test]
fn installs_new_tasks_and_links_both_directions() -> TestResult {
    let h = Harness::without_cleanup();

    let created = h
        .service
        .submit(&GraphBuilder::new().idle("X").idle("Y").edge("Y", "X").build())?;

    let names: Vec<_> = created.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["X", "Y"]);

    let x = h.task("X").unwrap();
    let y = h.task("Y").unwrap();
    assert_eq!(x.dependents, set(&["Y"]));
    assert!(x.dependencies.is_empty());
    assert_eq!(y.dependencies, set(&["X"]));
    assert_eq!(y.unfinished_dependencies, 1);
    assert_eq!(x.state, State::New);
    assert_eq!(y.state, State::New);
    assert!(h.invoker.calls().is_empty());
    Ok(())
}

#[test]
fn extends_an_existing_graph() -> TestResult {
    let h = Harness::without_cleanup();
    h.service
        .submit(&GraphBuilder::new().idle("X").idle("Y").edge("Y", "X").build())?;

    let created = h
        .service
        .submit(&GraphBuilder::new().active("Z").edge("Z", "X").build())?;

    assert_eq!(created.len(), 1);
    assert_eq!(created[0].state, State::Waiting);
    assert_eq!(h.task("X").unwrap().dependents, set(&["Y", "Z"]));
    assert_eq!(h.task("Z").unwrap().unfinished_dependencies, 1);
    Ok(())
}

#[test]
fn re_adding_an_edge_changes_nothing() -> TestResult {
    let h = Harness::without_cleanup();
    h.service
        .submit(&GraphBuilder::new().idle("X").idle("Y").edge("Y", "X").build())?;

    h.service.submit(&GraphBuilder::new().edge("Y", "X").build())?;

    let y = h.task("Y").unwrap();
    assert_eq!(y.dependencies, set(&["X"]));
    assert_eq!(y.unfinished_dependencies, 1);
    Ok(())
}

#[test]
fn self_dependency_is_rejected() {
    let h = Harness::without_cleanup();

    let err = h
        .service
        .submit(&GraphBuilder::new().idle("a").edge("a", "a").build())
        .unwrap_err();

    assert!(matches!(err, RexError::SelfDependency(ref id) if id == "a"), "{err:?}");
    assert!(h.store.is_empty());
}

#[test]
fn unknown_endpoint_is_a_bad_request() {
    let h = Harness::without_cleanup();

    let err = h
        .service
        .submit(&GraphBuilder::new().idle("Y").edge("Y", "ghost").build())
        .unwrap_err();

    match err {
        RexError::BadRequest(msg) => assert!(msg.contains("ghost"), "{msg}"),
        other => panic!("expected BadRequest, got {other:?}"),
    }
    assert!(h.store.is_empty());
}

#[test]
fn redeclaring_a_stored_task_conflicts() -> TestResult {
    let h = Harness::without_cleanup();
    h.service.submit(&GraphBuilder::new().idle("X").build())?;

    let err = h
        .service
        .submit(&GraphBuilder::new().idle("X").build())
        .unwrap_err();

    assert!(matches!(err, RexError::Conflict(_)), "{err:?}");
    Ok(())
}

#[test]
fn running_task_cannot_take_new_dependencies() -> TestResult {
    let h = Harness::without_cleanup();
    h.service.submit(&GraphBuilder::new().active("X").build())?;
    assert_eq!(h.state("X"), Some(State::Up));

    let err = h
        .service
        .submit(&GraphBuilder::new().idle("N").edge("X", "N").build())
        .unwrap_err();

    assert!(matches!(err, RexError::Conflict(_)), "{err:?}");
    assert!(h.task("N").is_none());
    assert!(h.task("X").unwrap().dependencies.is_empty());
    Ok(())
}

#[test]
fn loop_through_stored_tasks_is_rolled_back() -> TestResult {
    let h = Harness::without_cleanup();
    h.service
        .submit(&GraphBuilder::new().idle("a").idle("b").edge("a", "b").build())?;
    let before_a = h.task("a").unwrap();
    let before_b = h.task("b").unwrap();

    let err = h
        .service
        .submit(&GraphBuilder::new().edge("b", "a").build())
        .unwrap_err();

    match err {
        RexError::Cycle(msg) => {
            assert_eq!(msg, "Cycle has been found on task a with loop: a->b->a")
        }
        other => panic!("expected Cycle, got {other:?}"),
    }
    assert_eq!(h.task("a").unwrap(), before_a);
    assert_eq!(h.task("b").unwrap(), before_b);
    Ok(())
}

#[test]
fn loop_among_new_tasks_stores_nothing() {
    let h = Harness::without_cleanup();

    let err = h
        .service
        .submit(
            &GraphBuilder::new()
                .active("p")
                .active("q")
                .active("r")
                .edge("p", "q")
                .edge("q", "r")
                .edge("r", "p")
                .build(),
        )
        .unwrap_err();

    assert!(matches!(err, RexError::Cycle(_)), "{err:?}");
    assert!(h.store.is_empty());
    assert!(h.invoker.calls().is_empty());
}

#[test]
fn finished_dependency_does_not_hold_back_a_new_task() -> TestResult {
    let h = Harness::without_cleanup();
    h.service.submit(&GraphBuilder::new().active("X").build())?;
    h.service.finish("X", true, serde_json::json!({"ok": true}))?;
    assert_eq!(h.state("X"), Some(State::Successful));

    h.service
        .submit(&GraphBuilder::new().active("N").edge("N", "X").build())?;

    let n = h.task("N").unwrap();
    assert_eq!(n.unfinished_dependencies, 0);
    assert_eq!(n.state, State::Up);
    assert_eq!(h.task("X").unwrap().dependents, set(&["N"]));
    Ok(())
}
