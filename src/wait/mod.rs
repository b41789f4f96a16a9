//! Bounded polling of page state.
//!
//! The target application renders asynchronously and exposes no
//! completion signal, so readiness is established by re-evaluating a
//! predicate until it holds or the budget runs out.
//!
//! Every wait terminates:
//!
//! - the predicate is evaluated at most once per poll interval,
//! - a single evaluation is cut off half a poll interval after the budget,
//! - reading the session state for the timeout report is cut off three
//!   quarters of a poll interval after the budget,
//!
//! so a call returns strictly before `timeout + poll_interval` elapses,
//! even when the driver itself stops answering.
//!
//! # Example
//!
//! ```ignore
//! use resilient_driver::wait::conditions;
//!
//! // Compound conditions are plain boolean logic inside the predicate.
//! session
//!     .wait("result or error banner")
//!     .until(|| async {
//!         Ok(conditions::visible(&session, &results).await?
//!             || conditions::visible(&session, &error_banner).await?)
//!     })
//!     .await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Primitive predicates over session state.
pub mod conditions;

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::session::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, Session};

// ============================================================================
// Wait
// ============================================================================

/// A bounded, polled wait condition.
///
/// Built per call; carries a description that names the condition in
/// logs and in the [`Error::Timeout`] it may produce.
#[derive(Debug, Clone)]
pub struct Wait {
    /// What is being waited for.
    description: String,
    /// Total budget.
    timeout: Duration,
    /// Delay between evaluations.
    poll_interval: Duration,
    /// Session used to annotate timeouts.
    session: Option<Session>,
}

impl Wait {
    /// Creates a wait with crate defaults and no session context.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            session: None,
        }
    }

    /// Sets the total budget.
    #[inline]
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the delay between evaluations.
    ///
    /// A zero interval is raised to one millisecond.
    #[inline]
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Returns the description.
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the total budget.
    #[inline]
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.timeout
    }
}

// ============================================================================
// Wait - Polling
// ============================================================================

impl Wait {
    /// Polls `predicate` until it returns `true`.
    ///
    /// Recoverable predicate errors (stale or missing elements) count as
    /// `false`; any other error is returned immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] when the budget is exhausted.
    pub async fn until<F, Fut>(&self, mut predicate: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        self.until_some(|| {
            let fut = predicate();
            async move { fut.await.map(|holds| holds.then_some(())) }
        })
        .await
    }

    /// Polls `probe` until it yields a value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] when the budget is exhausted.
    pub async fn until_some<T, F, Fut>(&self, mut probe: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let start = Instant::now();
        let deadline = start + self.timeout;
        let evaluation_deadline = deadline + self.poll_interval / 2;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match timeout_at(evaluation_deadline, probe()).await {
                Ok(Ok(Some(value))) => {
                    debug!(
                        condition = %self.description,
                        attempts,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Condition met"
                    );
                    return Ok(value);
                }
                Ok(Ok(None)) => {}
                Ok(Err(err)) if err.is_recoverable() => {
                    trace!(condition = %self.description, error = %err, "Treating error as not yet");
                }
                Ok(Err(err)) => return Err(err),
                Err(_) => {
                    debug!(condition = %self.description, "Evaluation overran budget");
                    break;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }

        debug!(
            condition = %self.description,
            attempts,
            timeout_ms = self.timeout.as_millis() as u64,
            "Condition timed out"
        );
        Err(self.timed_out(deadline).await)
    }

    /// Builds the timeout error, annotated when a session is attached.
    ///
    /// State that cannot be read shortly after `deadline` is reported as
    /// unknown.
    async fn timed_out(&self, deadline: Instant) -> Error {
        let err = Error::timeout(&self.description, self.timeout.as_millis() as u64);
        match &self.session {
            Some(session) => {
                let report_deadline = deadline + self.poll_interval * 3 / 4;
                session.annotate_until(err, report_deadline).await
            }
            None => err,
        }
    }
}

// ============================================================================
// Session - Wait Construction
// ============================================================================

impl Session {
    /// Creates a wait using the session's default budget and interval.
    ///
    /// Timeouts produced by it report the session's URL and context count.
    #[must_use]
    pub fn wait(&self, description: impl Into<String>) -> Wait {
        Wait {
            description: description.into(),
            timeout: self.options().default_timeout,
            poll_interval: self.options().poll_interval,
            session: Some(self.clone()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
