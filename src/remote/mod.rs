// src/remote/mod.rs

//! Remote invocation of workers and submitters.
//!
//! The scheduler only talks to a [`RemoteInvoker`]. The production
//! implementation is [`HttpInvoker`]; tests provide their own that records
//! calls and answers from a script.
//!
//! Invocation is blocking and must only be called from a thread that is
//! allowed to block, never from the thread committing a transaction.

pub mod http;

use std::fmt;

use serde_json::{json, Value};

use crate::engine::EngineOptions;
use crate::model::{Request, Task};
use crate::types::Transition;

pub use http::{HttpInvoker, RetryPolicy};

/// Result of a remote call after the invoker's own retries.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    /// The remote side answered, whatever the status.
    Responded { status: u16, body: Value },
    /// Every attempt failed before a response arrived.
    Unreachable(String),
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Responded { status, .. } if (200..300).contains(status))
    }
}

/// Trait abstracting how remote requests are sent.
pub trait RemoteInvoker: Send + Sync + fmt::Debug {
    fn invoke(&self, request: &Request) -> InvocationOutcome;
}

/// Start call for `task`: the submitted body wrapped with the callback URL
/// the worker reports back to.
pub fn start_request(options: &EngineOptions, task: &Task) -> Request {
    wrap_for_worker(options, task, &task.remote_start)
}

pub fn stop_request(options: &EngineOptions, task: &Task) -> Request {
    wrap_for_worker(options, task, &task.remote_cancel)
}

fn wrap_for_worker(options: &EngineOptions, task: &Task, request: &Request) -> Request {
    let body = json!({
        "payload": request.body,
        "callback": options.callback_url(&task.name),
    });
    request.clone().with_body(body)
}

/// Notification for the submitter of `task`, or `None` if it did not ask
/// to be notified.
pub fn notification_request(
    options: &EngineOptions,
    transition: Transition,
    task: &Task,
) -> Option<Request> {
    let request = task.caller_notification.as_ref()?;
    let body = json!({
        "task": task.name,
        "before": transition.before(),
        "after": transition.after(),
        "deployment": options.deployment,
        "payload": request.body,
    });
    Some(request.clone().with_body(body))
}
