#![allow(dead_code)]

use rex_scheduler::model::{Edge, Request, TaskGraph, TaskTemplate};
use rex_scheduler::types::{Method, Mode};
use serde_json::Value;

/// Start endpoint the builders give task `name`.
pub fn start_uri(name: &str) -> String {
    format!("http://worker/{name}/start")
}

/// Stop endpoint the builders give task `name`.
pub fn stop_uri(name: &str) -> String {
    format!("http://worker/{name}/stop")
}

/// Builder for `TaskTemplate`. Defaults to an ACTIVE task with
/// [`start_uri`]/[`stop_uri`] endpoints and no caller notification.
pub struct TemplateBuilder {
    template: TaskTemplate,
}

impl TemplateBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            template: TaskTemplate {
                remote_start: Request::new(Method::Post, start_uri(name)),
                remote_cancel: Request::new(Method::Post, stop_uri(name)),
                caller_notification: None,
                mode: Mode::Active,
            },
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.template.mode = mode;
        self
    }

    pub fn idle(self) -> Self {
        self.mode(Mode::Idle)
    }

    pub fn start_body(mut self, body: Value) -> Self {
        self.template.remote_start.body = body;
        self
    }

    pub fn notify(mut self, uri: &str) -> Self {
        self.template.caller_notification = Some(Request::new(Method::Post, uri));
        self
    }

    pub fn build(self) -> TaskTemplate {
        self.template
    }
}

/// Builder for a `TaskGraph` submission.
#[derive(Default)]
pub struct GraphBuilder {
    graph: TaskGraph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(mut self, name: &str, template: TemplateBuilder) -> Self {
        self.graph.vertices.insert(name.to_string(), template.build());
        self
    }

    /// New ACTIVE task with default endpoints.
    pub fn active(self, name: &str) -> Self {
        self.task(name, TemplateBuilder::new(name))
    }

    /// New IDLE task with default endpoints.
    pub fn idle(self, name: &str) -> Self {
        self.task(name, TemplateBuilder::new(name).idle())
    }

    /// `dependent` waits for `dependency`.
    pub fn edge(mut self, dependent: &str, dependency: &str) -> Self {
        self.graph.edges.push(Edge::new(dependent, dependency));
        self
    }

    pub fn build(self) -> TaskGraph {
        self.graph
    }
}
