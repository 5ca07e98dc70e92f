// src/jobs/invoke.rs

//! Bodies of the jobs that talk to remote parties. They run after commit on
//! a thread that may block, and feed worker answers back to the controller
//! in fresh transactions.

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::engine::{retry_on_conflict, Engine};
use crate::errors::{Result, RexError};
use crate::model::Task;
use crate::remote::{self, InvocationOutcome};
use crate::types::{State, Transition};

pub(super) fn start(engine: &Engine, task: &Task) -> Result<()> {
    let request = remote::start_request(engine.options(), task);
    info!(task = %task.name, uri = %request.uri, "starting remote task");

    match engine.invoker().invoke(&request) {
        InvocationOutcome::Responded { status, body } if (200..300).contains(&status) => {
            report(engine, &task.name, State::Starting, true, body)
        }
        InvocationOutcome::Responded { status, body } => report(
            engine,
            &task.name,
            State::Starting,
            false,
            json!({ "status": status, "body": body }),
        ),
        InvocationOutcome::Unreachable(reason) => report(
            engine,
            &task.name,
            State::Starting,
            false,
            Value::String(format!("START: System failure. Exception: {reason}")),
        ),
    }
}

/// A successful stop call is not the acknowledgement; the worker confirms
/// through its callback. Only a failed call drives the task.
pub(super) fn stop(engine: &Engine, task: &Task) -> Result<()> {
    let request = remote::stop_request(engine.options(), task);
    info!(task = %task.name, uri = %request.uri, "stopping remote task");

    match engine.invoker().invoke(&request) {
        InvocationOutcome::Responded { status, .. } if (200..300).contains(&status) => {
            debug!(task = %task.name, status, "stop requested; awaiting acknowledgement");
            Ok(())
        }
        InvocationOutcome::Responded { status, body } => report(
            engine,
            &task.name,
            State::Stopping,
            false,
            json!({ "status": status, "body": body }),
        ),
        InvocationOutcome::Unreachable(reason) => report(
            engine,
            &task.name,
            State::Stopping,
            false,
            Value::String(format!("STOP: System failure. Exception: {reason}")),
        ),
    }
}

pub(super) fn notify_caller(engine: &Engine, transition: Transition, task: &Task) -> Result<()> {
    let Some(request) = remote::notification_request(engine.options(), transition, task) else {
        return Ok(());
    };

    match engine.invoker().invoke(&request) {
        outcome if outcome.is_success() => {
            debug!(task = %task.name, %transition, "caller notified");
            Ok(())
        }
        InvocationOutcome::Responded { status, .. } => Err(RexError::Remote(format!(
            "caller of task {} answered {status} to {transition}",
            task.name
        ))),
        InvocationOutcome::Unreachable(reason) => Err(RexError::Remote(format!(
            "caller of task {} unreachable: {reason}",
            task.name
        ))),
    }
}

/// Feed a worker answer to `accept`/`fail`, as long as the task is still in
/// the state the call was made for. A task that moved on (cancelled while
/// starting, already deleted) drops the stale answer.
fn report(engine: &Engine, id: &str, expected: State, positive: bool, body: Value) -> Result<()> {
    retry_on_conflict("report remote outcome", engine.options().internal_attempts, || {
        engine.in_transaction(|tx| {
            match tx.peek_task(id)? {
                Some(task) if task.state == expected => {}
                Some(task) => {
                    debug!(task = %id, state = %task.state, %expected, "task moved on; dropping remote answer");
                    return Ok(());
                }
                None => {
                    debug!(task = %id, "task no longer exists; dropping remote answer");
                    return Ok(());
                }
            }

            let controller = engine.controller();
            if positive {
                controller.accept(tx, id, body.clone())
            } else {
                controller.fail(tx, id, body.clone())
            }
        })
    })
}
