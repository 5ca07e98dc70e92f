// src/remote/http.rs

//! [`RemoteInvoker`] over blocking `reqwest`.
//!
//! Transport failures (connect, timeout, broken body) are retried with
//! exponential backoff. Any HTTP response, including 4xx/5xx, ends the
//! retry loop and is handed back as [`InvocationOutcome::Responded`].

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::model::Request;
use crate::remote::{InvocationOutcome, RemoteInvoker};
use crate::types::Method;

/// Backoff for transport retries: `base_delay * multiplier^(attempt - 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1) as i32;
        Duration::from_secs_f64(self.base_delay.as_secs_f64() * self.multiplier.powi(exp))
    }
}

#[derive(Debug)]
pub struct HttpInvoker {
    timeout: Duration,
    retry: RetryPolicy,
    // The blocking client must be created off the async runtime threads, so
    // it is built on first use by whichever blocking thread gets there first.
    client: OnceLock<Client>,
}

impl HttpInvoker {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            timeout,
            retry,
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&Client, String> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let built = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| format!("cannot build HTTP client: {e}"))?;
        Ok(self.client.get_or_init(|| built))
    }

    fn send_once(&self, request: &Request) -> Result<InvocationOutcome, String> {
        let client = self.client()?;
        let mut builder = match request.method {
            Method::Get => client.get(&request.uri),
            Method::Post => client.post(&request.uri),
            Method::Put => client.put(&request.uri),
            Method::Patch => client.patch(&request.uri),
            Method::Delete => client.delete(&request.uri),
            Method::Head => client.head(&request.uri),
            Method::Options => client.request(reqwest::Method::OPTIONS, &request.uri),
        };
        for header in &request.headers {
            builder = builder.header(&header.name, &header.value);
        }
        if !request.body.is_null() {
            builder = builder.json(&request.body);
        }

        let response = builder.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let text = response.text().map_err(|e| e.to_string())?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(InvocationOutcome::Responded { status, body })
    }
}

impl RemoteInvoker for HttpInvoker {
    fn invoke(&self, request: &Request) -> InvocationOutcome {
        trace!(uri = %request.uri, method = ?request.method, body = %request.body, "sending remote request");
        let attempts = self.retry.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.send_once(request) {
                Ok(outcome) => {
                    debug!(uri = %request.uri, attempt, ?outcome, "remote request answered");
                    return outcome;
                }
                Err(err) => {
                    warn!(uri = %request.uri, attempt, error = %err, "remote request failed");
                    last_error = err;
                    if attempt < attempts {
                        std::thread::sleep(self.retry.next_delay(attempt));
                    }
                }
            }
        }
        InvocationOutcome::Unreachable(last_error)
    }
}
