use std::collections::HashMap;

use parking_lot::Mutex;
use rex_scheduler::model::Request;
use rex_scheduler::remote::{InvocationOutcome, RemoteInvoker};
use serde_json::{json, Value};

/// A fake remote side that:
/// - records every request it receives, in order
/// - answers from a per-URI script, or `200 {}` for anything unscripted.
///
/// Scripted answers stick: every call to the URI gets the same outcome until
/// it is scripted again.
#[derive(Debug, Default)]
pub struct FakeInvoker {
    calls: Mutex<Vec<Request>>,
    script: Mutex<HashMap<String, InvocationOutcome>>,
}

impl FakeInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, uri: &str, status: u16, body: Value) {
        self.script
            .lock()
            .insert(uri.to_string(), InvocationOutcome::Responded { status, body });
    }

    pub fn unreachable(&self, uri: &str) {
        self.script.lock().insert(
            uri.to_string(),
            InvocationOutcome::Unreachable("connection refused".to_string()),
        );
    }

    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, uri: &str) -> Vec<Request> {
        self.calls
            .lock()
            .iter()
            .filter(|r| r.uri == uri)
            .cloned()
            .collect()
    }

    /// URIs called so far, in call order.
    pub fn called_uris(&self) -> Vec<String> {
        self.calls.lock().iter().map(|r| r.uri.clone()).collect()
    }
}

impl RemoteInvoker for FakeInvoker {
    fn invoke(&self, request: &Request) -> InvocationOutcome {
        self.calls.lock().push(request.clone());
        self.script
            .lock()
            .get(&request.uri)
            .cloned()
            .unwrap_or_else(|| InvocationOutcome::Responded {
                status: 200,
                body: json!({}),
            })
    }
}
