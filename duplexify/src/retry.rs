//! Fixed-delay retry policies.
//!
//! Two policies drive the merge worker: a bounded one around the merge tool
//! and an unbounded one around moving failed inputs into quarantine.
//!
//! # Examples
//!
//! ```no_run
//! use duplexify::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), std::io::Error> {
//! let policy = RetryPolicy::merge(5, Duration::from_secs(5));
//! policy
//!     .run(
//!         |_attempt| async { Ok::<_, std::io::Error>(()) },
//!         |_err| true,
//!         |attempt, err| eprintln!("attempt {attempt} failed: {err}"),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

/// How many times an operation may run in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempts {
    /// At most this many attempts (values below one behave like one).
    Limited(u32),
    /// Until the operation succeeds or fails with a non-retryable error.
    Unlimited,
}

/// Retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: Attempts,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy from its parts.
    pub fn new(attempts: Attempts, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// One attempt plus `retries` retries.
    pub fn merge(retries: u32, delay: Duration) -> Self {
        Self::new(Attempts::Limited(retries.saturating_add(1)), delay)
    }

    /// Retry until success.
    pub fn forever(delay: Duration) -> Self {
        Self::new(Attempts::Unlimited, delay)
    }

    /// Total attempts allowed.
    pub fn attempts(&self) -> Attempts {
        self.attempts
    }

    /// Delay between attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn exhausted(&self, attempt: u32) -> bool {
        match self.attempts {
            Attempts::Limited(max) => attempt >= max,
            Attempts::Unlimited => false,
        }
    }

    /// Run `op` until it succeeds, the attempts are used up, or it fails
    /// with an error `is_retryable` rejects.
    ///
    /// `op` receives the 1-based attempt number. `on_retry` is called with
    /// the number and error of every failed attempt that will be retried,
    /// before the delay.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt.
    pub async fn run<T, E, F, Fut, R, C>(
        &self,
        mut op: F,
        is_retryable: R,
        mut on_retry: C,
    ) -> std::result::Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        R: Fn(&E) -> bool,
        C: FnMut(u32, &E),
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !is_retryable(&err) || self.exhausted(attempt) {
                        return Err(err);
                    }
                    on_retry(attempt, &err);
                    tokio::time::sleep(self.delay).await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }
}
