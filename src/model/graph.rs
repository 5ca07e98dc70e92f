// src/model/graph.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::task::Request;
use crate::model::TaskId;
use crate::types::Mode;

/// Declaration of a new task inside a submitted graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub remote_start: Request,
    pub remote_cancel: Request,
    #[serde(default)]
    pub caller_notification: Option<Request>,
    #[serde(default)]
    pub mode: Mode,
}

/// `dependent` waits for `dependency` to finish.
///
/// Edges are not persisted on their own; installation compiles them into
/// the `dependencies`/`dependents` sets of the two tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    #[serde(alias = "dependant")]
    pub dependent: TaskId,
    pub dependency: TaskId,
}

impl Edge {
    pub fn new(dependent: impl Into<TaskId>, dependency: impl Into<TaskId>) -> Self {
        Self {
            dependent: dependent.into(),
            dependency: dependency.into(),
        }
    }
}

/// A submission: new tasks keyed by identifier plus edges that may reference
/// both new and already stored tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskGraph {
    #[serde(default)]
    pub vertices: BTreeMap<TaskId, TaskTemplate>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}
