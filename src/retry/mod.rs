//! Bounded retry with exponential backoff and jitter.
//!
//! [`RetryPolicy`] describes how many attempts to make and how to space
//! them; [`RetryExecutor`] applies a policy to repeated invocations of a
//! single attempt function, honoring cancellation before each attempt and
//! during every backoff wait. Attempts are strictly sequential.

use rand::Rng;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::base::error::RestError;
use crate::http::response::Response;

/// Predicate deciding whether an attempt outcome is retryable.
pub type RetryPredicate = Arc<dyn Fn(Option<&Response>, Option<&RestError>) -> bool + Send + Sync>;

/// Retry policy configuration.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, clamped to at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_interval: Duration,
    /// Backoff cap; zero means uncapped.
    pub max_interval: Duration,
    /// Growth factor per attempt; values ≤ 0 behave as no growth.
    pub backoff_multiplier: f64,
    /// Jitter fraction in `[0, 1]`, applied as `uniform(-1, 1) * fraction *
    /// delay`.
    pub jitter_fraction: f64,
    /// Custom retryability predicate; `None` uses the default condition
    /// (any error, or a 5xx/429 response).
    pub retry_if: Option<RetryPredicate>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_fraction: 0.1,
            retry_if: None,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_interval", &self.initial_interval)
            .field("max_interval", &self.max_interval)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("jitter_fraction", &self.jitter_fraction)
            .field("retry_if", &self.retry_if.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter_fraction(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn with_retry_if(
        mut self,
        predicate: impl Fn(Option<&Response>, Option<&RestError>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.retry_if = Some(Arc::new(predicate));
        self
    }

    /// Whether an attempt outcome should be retried.
    pub fn should_retry(&self, response: Option<&Response>, error: Option<&RestError>) -> bool {
        match &self.retry_if {
            Some(predicate) => predicate(response, error),
            None => default_should_retry(response, error),
        }
    }

    /// Backoff delay before attempt `attempt + 1`.
    ///
    /// `min(initial * multiplier^attempt, cap)`, then jittered by
    /// `uniform(-1, 1) * jitter_fraction * delay`, clamped to ≥ 0.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = if self.backoff_multiplier <= 0.0 {
            1.0
        } else {
            self.backoff_multiplier.powi(attempt as i32)
        };
        let mut delay = self.initial_interval.as_secs_f64() * factor;
        if self.max_interval > Duration::ZERO {
            delay = delay.min(self.max_interval.as_secs_f64());
        }
        if self.jitter_fraction > 0.0 {
            let amplitude = delay * self.jitter_fraction;
            if amplitude.is_finite() && amplitude > 0.0 {
                delay += rand::thread_rng().gen_range(-amplitude..=amplitude);
            }
        }
        // Uncapped policies can overflow f64 at extreme attempt indices.
        Duration::try_from_secs_f64(delay.max(0.0)).unwrap_or(Duration::MAX)
    }
}

/// Default retryability: any error, or a 5xx/429 response.
pub fn default_should_retry(response: Option<&Response>, error: Option<&RestError>) -> bool {
    if error.is_some() {
        return true;
    }
    match response {
        Some(resp) => {
            let status = resp.status().as_u16();
            status >= 500 || status == 429
        }
        None => false,
    }
}

/// Applies a [`RetryPolicy`] to repeated invocations of an attempt
/// function.
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run the attempt function until it yields a non-retryable outcome or
    /// the policy is exhausted.
    ///
    /// The cancellation token is checked before each attempt and during
    /// every backoff wait; a cancellation at either point aborts with
    /// [`RestError::Cancelled`] rather than counting as a retryable
    /// failure. Exhaustion yields [`RestError::RetryExhausted`] wrapping
    /// the last outcome.
    pub async fn execute<F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<Response, RestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Response, RestError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last: Option<Result<Response, RestError>> = None;

        for attempt_index in 0..max_attempts {
            if cancel.is_cancelled() {
                return Err(RestError::Cancelled);
            }

            let outcome = attempt().await;
            let retryable = self
                .policy
                .should_retry(outcome.as_ref().ok(), outcome.as_ref().err());

            if !retryable {
                // Success or terminal failure; both stop the loop.
                return outcome;
            }
            last = Some(outcome);

            if attempt_index + 1 == max_attempts {
                break;
            }

            let delay = self.policy.backoff_delay(attempt_index);
            tracing::warn!(
                attempt = attempt_index,
                delay_ms = delay.as_millis() as u64,
                "retryable failure, backing off"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(RestError::Cancelled),
                _ = sleep(delay) => {}
            }
        }

        let source = match last {
            Some(Err(error)) => error,
            Some(Ok(response)) => {
                let url = response.url().to_string();
                RestError::from_response(url, response)
            }
            // Unreachable with max_attempts clamped to ≥ 1.
            None => return Err(RestError::Cancelled),
        };

        tracing::debug!(attempts = max_attempts, "retry policy exhausted");
        Err(RestError::RetryExhausted {
            attempts: max_attempts,
            source: Box::new(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn connection_error() -> RestError {
        RestError::Connection {
            url: "http://example.com/".into(),
            source: "connection refused".into(),
        }
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy::new()
            .with_initial_interval(Duration::from_millis(100))
            .with_max_interval(Duration::from_secs(1))
            .with_backoff_multiplier(2.0)
            .with_jitter_fraction(0.0);

        assert_eq!(policy.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(1000));
    }

    #[test]
    fn zero_multiplier_means_no_growth() {
        let policy = RetryPolicy::new()
            .with_initial_interval(Duration::from_millis(50))
            .with_backoff_multiplier(0.0)
            .with_jitter_fraction(0.0);

        assert_eq!(policy.backoff_delay(0), Duration::from_millis(50));
        assert_eq!(policy.backoff_delay(5), Duration::from_millis(50));
    }

    #[test]
    fn zero_max_interval_means_uncapped() {
        let policy = RetryPolicy::new()
            .with_initial_interval(Duration::from_millis(100))
            .with_max_interval(Duration::ZERO)
            .with_backoff_multiplier(2.0)
            .with_jitter_fraction(0.0);

        assert_eq!(policy.backoff_delay(10), Duration::from_millis(102_400));
    }

    #[test]
    fn extreme_uncapped_backoff_saturates_without_panicking() {
        let policy = RetryPolicy::new()
            .with_initial_interval(Duration::from_secs(1))
            .with_max_interval(Duration::ZERO)
            .with_backoff_multiplier(10.0)
            .with_jitter_fraction(0.1);

        // 10^2000 overflows f64 to infinity.
        assert_eq!(policy.backoff_delay(2000), Duration::MAX);
    }

    #[test]
    fn jitter_stays_within_fraction() {
        let policy = RetryPolicy::new()
            .with_initial_interval(Duration::from_millis(100))
            .with_backoff_multiplier(1.0)
            .with_jitter_fraction(0.1);

        for _ in 0..100 {
            let delay = policy.backoff_delay(0);
            assert!(delay >= Duration::from_millis(90), "delay {delay:?}");
            assert!(delay <= Duration::from_millis(110), "delay {delay:?}");
        }
    }

    #[tokio::test]
    async fn exhaustion_counts_attempts_and_wraps_last_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new()
            .with_max_attempts(3)
            .with_initial_interval(Duration::from_millis(1))
            .with_jitter_fraction(0.0);
        let executor = RetryExecutor::new(policy);
        let cancel = CancellationToken::new();

        let result = executor
            .execute(&cancel, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(connection_error()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let err = result.unwrap_err();
        assert!(err.is_retry_exhausted());
        match err {
            RestError::RetryExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(source.is_connection());
            }
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new()
            .with_max_attempts(5)
            .with_initial_interval(Duration::from_millis(1))
            .with_jitter_fraction(0.0);
        let executor = RetryExecutor::new(policy);
        let cancel = CancellationToken::new();

        let result = executor
            .execute(&cancel, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(connection_error())
                    } else {
                        Ok(crate::http::Response::new(
                            http::StatusCode::OK,
                            http::Version::HTTP_11,
                            http::HeaderMap::new(),
                            bytes::Bytes::from_static(b"ok"),
                            url::Url::parse("http://example.com/").unwrap(),
                        ))
                    }
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap().status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn custom_predicate_stops_immediately() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new()
            .with_max_attempts(5)
            .with_retry_if(|_, _| false);
        let executor = RetryExecutor::new(policy);
        let cancel = CancellationToken::new();

        let result = executor
            .execute(&cancel, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(connection_error()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.unwrap_err().is_connection());
    }

    #[tokio::test]
    async fn pre_cancelled_token_makes_no_attempt() {
        let calls = AtomicU32::new(0);
        let executor = RetryExecutor::new(RetryPolicy::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = executor
            .execute(&cancel, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(connection_error()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn cancellation_during_backoff_aborts_with_cancelled() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new()
            .with_max_attempts(3)
            .with_initial_interval(Duration::from_secs(60))
            .with_jitter_fraction(0.0);
        let executor = RetryExecutor::new(policy);
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                cancel.cancel();
            })
        };

        let counter = calls.clone();
        let result = executor
            .execute(&cancel, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(connection_error()) }
            })
            .await;

        canceller.await.unwrap();
        // One attempt ran, then the backoff wait was interrupted.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.unwrap_err().is_cancelled());
    }
}
