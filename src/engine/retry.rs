// src/engine/retry.rs

use std::time::Duration;

use tracing::warn;

use crate::errors::Result;

/// Re-run `op` from scratch while it fails with a concurrent update, up to
/// `attempts` runs in total. Any other error is returned immediately.
pub fn retry_on_conflict<T>(
    operation: &str,
    attempts: u32,
    mut op: impl FnMut() -> Result<T>,
) -> Result<T> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Err(err) if err.is_retryable() && attempt < attempts => {
                warn!(operation, attempt, error = %err, "lost optimistic race; retrying");
                std::thread::sleep(backoff(attempt));
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(10 * u64::from(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RexError;

    #[test]
    fn retries_until_success() {
        let mut calls = 0;
        let out = retry_on_conflict("test", 5, || {
            calls += 1;
            if calls < 3 {
                Err(RexError::ConcurrentUpdate("busy".into()))
            } else {
                Ok(calls)
            }
        })
        .unwrap();
        assert_eq!(out, 3);
    }

    #[test]
    fn gives_up_after_the_last_attempt() {
        let mut calls = 0;
        let err = retry_on_conflict("test", 2, || -> Result<()> {
            calls += 1;
            Err(RexError::ConcurrentUpdate("busy".into()))
        })
        .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(calls, 2);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let mut calls = 0;
        let err = retry_on_conflict("test", 5, || -> Result<()> {
            calls += 1;
            Err(RexError::Conflict("exists".into()))
        })
        .unwrap_err();
        assert!(matches!(err, RexError::Conflict(_)));
        assert_eq!(calls, 1);
    }
}
