//! Bounded retry primitives shared by every record source call.
//!
//! Replaces hand-written polling loops: one per-call timeout, one predicate wait with a deadline,
//! and the backoff slept between consecutive hiccups.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::record_source::AccessError;

/// Timing and tolerance of collaborator calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound for a single collaborator call or readiness wait.
    pub call_timeout: Duration,
    /// Delay between readiness probes.
    pub poll_interval: Duration,
    /// Consecutive hiccups after which the run gives up.
    pub max_consecutive_hiccups: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Upper bound of the random delay added to each backoff.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(100),
            max_consecutive_hiccups: 10,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(30),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// No backoff and short waits, for in-memory sources.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            call_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(1),
            max_consecutive_hiccups: 10,
            backoff_base: Duration::ZERO,
            backoff_max: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Delay before retrying after the `consecutive`-th hiccup in a row:
    /// `base * 2^(consecutive - 1)`, capped at `backoff_max`, plus jitter.
    #[must_use]
    pub fn hiccup_backoff(&self, consecutive: u32) -> Duration {
        let exponent = consecutive.saturating_sub(1).min(16);
        let exponential = self
            .backoff_base
            .saturating_mul(2_u32.pow(exponent))
            .min(self.backoff_max);
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            exponential
        } else {
            exponential + Duration::from_millis(fastrand::u64(..=jitter_ms))
        }
    }
}

/// Runs one collaborator call under a timeout; an elapsed timer becomes [`AccessError::Timeout`].
pub async fn bounded_call<T, F>(
    timeout: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, AccessError>
where
    F: Future<Output = Result<T, AccessError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(AccessError::Timeout {
            operation,
            after: timeout,
        }),
    }
}

/// Polls `probe` until it reports `true`, the policy timeout passes, or `cancel` fires.
///
/// Probe errors are treated as "not yet" until the deadline.
pub async fn wait_until<F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: &'static str,
    mut probe: F,
) -> Result<(), AccessError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, AccessError>>,
{
    let deadline = Instant::now() + policy.call_timeout;
    let timed_out = || AccessError::Timeout {
        operation,
        after: policy.call_timeout,
    };

    loop {
        if cancel.is_cancelled() {
            return Err(AccessError::Cancelled);
        }
        match tokio::time::timeout_at(deadline, probe()).await {
            Ok(Ok(true)) => return Ok(()),
            Ok(Ok(false)) => {}
            Ok(Err(error)) => debug!(operation, %error, "readiness probe failed, polling again"),
            Err(_) => return Err(timed_out()),
        }
        if Instant::now() >= deadline {
            return Err(timed_out());
        }
        if !cancellable_sleep(policy.poll_interval, cancel).await {
            return Err(AccessError::Cancelled);
        }
    }
}

/// Sleeps for `duration` unless `cancel` fires first. Returns `false` when cancelled.
pub async fn cancellable_sleep(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}
