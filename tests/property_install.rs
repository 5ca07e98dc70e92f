mod common;
use crate::common::{GraphBuilder, Harness};

use std::collections::BTreeSet;

use proptest::prelude::*;
use rex_scheduler::errors::RexError;
use rex_scheduler::types::{State, StateFilter};

// Acyclic by construction: task N may only depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, picks)| {
                    if i == 0 {
                        BTreeSet::new()
                    } else {
                        picks.into_iter().map(|p| p % i).collect()
                    }
                })
                .collect()
        })
    })
}

fn name(i: usize) -> String {
    format!("task_{i}")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn acyclic_graphs_install_with_symmetric_links(deps in dag_strategy(8)) {
        let h = Harness::without_cleanup();
        let mut graph = GraphBuilder::new();
        for i in 0..deps.len() {
            graph = graph.idle(&name(i));
        }
        for (i, ds) in deps.iter().enumerate() {
            for d in ds {
                graph = graph.edge(&name(i), &name(*d));
            }
        }

        let created = h.service.submit(&graph.build()).unwrap();
        prop_assert_eq!(created.len(), deps.len());

        for (i, ds) in deps.iter().enumerate() {
            let task = h.task(&name(i)).unwrap();
            let expected: BTreeSet<String> = ds.iter().map(|d| name(*d)).collect();
            prop_assert_eq!(&task.dependencies, &expected);
            prop_assert_eq!(task.unfinished_dependencies as usize, expected.len());
            prop_assert_eq!(task.state, State::New);
            for d in &task.dependencies {
                let dependency = h.task(d).unwrap();
                prop_assert!(dependency.dependents.contains(&task.name));
            }
        }
    }

    #[test]
    fn closing_a_chain_into_a_loop_is_rejected(len in 2usize..7) {
        let h = Harness::without_cleanup();
        let mut graph = GraphBuilder::new();
        for i in 0..len {
            graph = graph.idle(&name(i));
        }
        for i in 1..len {
            graph = graph.edge(&name(i), &name(i - 1));
        }
        h.service.submit(&graph.build()).unwrap();
        let first = h.task(&name(0)).unwrap();

        let err = h
            .service
            .submit(&GraphBuilder::new().edge(&name(0), &name(len - 1)).build())
            .unwrap_err();

        prop_assert!(matches!(err, RexError::Cycle(_)));
        prop_assert_eq!(h.task(&name(0)).unwrap(), first);
    }

    #[test]
    fn running_tasks_never_exceed_the_ceiling(
        max in 0u64..4,
        tasks in 1usize..8,
        finish in proptest::collection::vec(any::<bool>(), 0..8),
    ) {
        let h = Harness::with_max_concurrent(max);
        let mut graph = GraphBuilder::new();
        for i in 0..tasks {
            graph = graph.active(&name(i));
        }
        h.service.submit(&graph.build()).unwrap();

        let running = || {
            h.service
                .list(StateFilter { running: true, ..StateFilter::default() })
                .unwrap()
                .len() as u64
        };
        prop_assert!(running() <= max);

        for positive in finish {
            let Some(task) = h
                .service
                .list(StateFilter { running: true, ..StateFilter::default() })
                .unwrap()
                .into_iter()
                .next()
            else {
                break;
            };
            h.service.finish(&task.name, positive, serde_json::Value::Null).unwrap();
            prop_assert!(running() <= max);
            prop_assert_eq!(h.running(), running());
        }
    }

    #[test]
    fn finished_tasks_never_move(positive in any::<bool>(), cancel_after in any::<bool>()) {
        let h = Harness::without_cleanup();
        h.service.submit(&GraphBuilder::new().active("t").build()).unwrap();
        h.service.finish("t", positive, serde_json::Value::Null).unwrap();
        let finished = h.task("t").unwrap();
        prop_assert!(finished.state.is_final());

        if cancel_after {
            h.service.cancel("t").unwrap();
        }
        prop_assert!(h.service.finish("t", true, serde_json::Value::Null).is_err());
        prop_assert_eq!(h.task("t").unwrap().state, finished.state);
    }
}
