// src/model/task.rs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::graph::TaskTemplate;
use crate::model::TaskId;
use crate::types::{Method, Mode, State, StopFlag};

/// A single HTTP header on a remote request descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Describes an HTTP call to a remote worker or to the submitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub method: Method,
    pub uri: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: Value,
}

impl Request {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Vec::new(),
            body: Value::Null,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }
}

/// Outcome reported by the remote worker, tagged with the state the task
/// was in when the report arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse {
    pub state: State,
    pub positive: bool,
    #[serde(default)]
    pub body: Value,
}

/// The unit of schedulable work as persisted in the versioned store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: TaskId,
    pub remote_start: Request,
    pub remote_cancel: Request,
    #[serde(default)]
    pub caller_notification: Option<Request>,
    pub mode: Mode,
    pub state: State,
    #[serde(default)]
    pub dependencies: BTreeSet<TaskId>,
    #[serde(default)]
    pub dependents: BTreeSet<TaskId>,
    pub unfinished_dependencies: i32,
    pub stop_flag: StopFlag,
    #[serde(default)]
    pub server_responses: Vec<ServerResponse>,
    #[serde(default)]
    pub starting: bool,
}

impl Task {
    /// Materialise a fresh task from a submitted template.
    pub fn from_template(name: impl Into<TaskId>, template: &TaskTemplate) -> Self {
        Self {
            name: name.into(),
            remote_start: template.remote_start.clone(),
            remote_cancel: template.remote_cancel.clone(),
            caller_notification: template.caller_notification.clone(),
            mode: template.mode,
            state: State::New,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            unfinished_dependencies: 0,
            stop_flag: StopFlag::None,
            server_responses: Vec::new(),
            starting: false,
        }
    }

    /// Whether a response of the given polarity was reported while the task
    /// was in `state`.
    pub fn has_response(&self, state: State, positive: bool) -> bool {
        self.server_responses
            .iter()
            .any(|r| r.state == state && r.positive == positive)
    }

    /// Record a worker report tagged with the current state.
    pub fn push_response(&mut self, positive: bool, body: Value) {
        self.server_responses.push(ServerResponse {
            state: self.state,
            positive,
            body,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> TaskTemplate {
        TaskTemplate {
            remote_start: Request::new(Method::Post, "http://worker/start"),
            remote_cancel: Request::new(Method::Post, "http://worker/stop"),
            caller_notification: None,
            mode: Mode::Active,
        }
    }

    #[test]
    fn from_template_starts_new_and_unlinked() {
        let task = Task::from_template("build", &template());
        assert_eq!(task.state, State::New);
        assert_eq!(task.mode, Mode::Active);
        assert_eq!(task.stop_flag, StopFlag::None);
        assert_eq!(task.unfinished_dependencies, 0);
        assert!(task.dependencies.is_empty() && task.dependents.is_empty());
    }

    #[test]
    fn responses_are_tagged_with_the_current_state() {
        let mut task = Task::from_template("build", &template());
        task.state = State::Starting;
        task.push_response(true, json!({"ok": true}));

        assert!(task.has_response(State::Starting, true));
        assert!(!task.has_response(State::Starting, false));
        assert!(!task.has_response(State::Up, true));
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let req: Request = serde_json::from_value(json!({"uri": "http://w/start"})).unwrap();
        assert_eq!(req.method, Method::Post);
        assert!(req.headers.is_empty());
        assert_eq!(req.body, Value::Null);
    }
}
