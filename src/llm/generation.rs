// ============================================================
// Layer 5 — Generation Wrapper
// ============================================================
// Calls a language model with bounded automatic retry.
//
// RetryPolicy is a plain value:
//   - max_attempts  total calls, including the first
//   - backoff       delay before attempt n (n ≥ 2)
//   - is_transient  which failures are worth another try
//   - sleeper       how to wait (thread::sleep, or a no-op
//                   recorder in tests)
//
// Default generation policy:
//   3 attempts, delay before attempt n = min(10s, 1s · 2^(n-1))
//   attempt 1 → no wait, attempt 2 → 2s, attempt 3 → 4s
//
// Outcome:
//   success             → the complete answer string
//   permanent failure   → GenerationError immediately
//   transient × 3       → GenerationError with the last cause
//
// Every attempt and every failure is logged with the query.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::{RagError, Result};

// ─── Backoff ──────────────────────────────────────────────────────────────────
/// `min(cap, multiplier · 2^(attempt-1))` for attempt ≥ 2; zero before the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExponentialBackoff {
    pub multiplier: Duration,
    pub cap:        Duration,
}

impl ExponentialBackoff {
    pub fn new(multiplier: Duration, cap: Duration) -> Self {
        Self { multiplier, cap }
    }

    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 1).min(31);
        self.multiplier
            .checked_mul(1u32 << exponent)
            .map_or(self.cap, |d| d.min(self.cap))
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(10))
    }
}

// ─── RetryPolicy ──────────────────────────────────────────────────────────────
type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
type Backoff      = Arc<dyn Fn(u32) -> Duration + Send + Sync>;
type Sleeper      = Arc<dyn Fn(Duration) + Send + Sync>;

pub struct RetryPolicy<E> {
    max_attempts: u32,
    backoff:      Backoff,
    is_transient: Predicate<E>,
    sleeper:      Sleeper,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff:      Arc::clone(&self.backoff),
            is_transient: Arc::clone(&self.is_transient),
            sleeper:      Arc::clone(&self.sleeper),
        }
    }
}

/// Why `RetryPolicy::run` gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed transiently.
    Exhausted { attempts: u32, last: E },
    /// A failure the predicate did not consider transient.
    Permanent { attempts: u32, error: E },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Permanent { attempts, .. } => *attempts,
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Permanent { error, .. } => error,
        }
    }
}

impl<E> RetryPolicy<E> {
    pub fn new<B, P>(max_attempts: u32, backoff: B, is_transient: P) -> Self
    where
        B: Fn(u32) -> Duration + Send + Sync + 'static,
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            max_attempts: max_attempts.max(1),
            backoff:      Arc::new(backoff),
            is_transient: Arc::new(is_transient),
            sleeper:      Arc::new(std::thread::sleep),
        }
    }

    /// Replace how the policy waits between attempts.
    #[cfg(test)]
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Fn(Duration) + Send + Sync + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_before(&self, attempt: u32) -> Duration {
        (self.backoff)(attempt)
    }

    /// Call `op` until it succeeds, fails permanently, or attempts run out.
    /// `op` receives the 1-based attempt number.
    pub fn run<T, F>(&self, mut op: F) -> std::result::Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> std::result::Result<T, E>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(error) if !(self.is_transient)(&error) => {
                    return Err(RetryError::Permanent { attempts: attempt, error });
                }
                Err(last) if attempt >= self.max_attempts => {
                    return Err(RetryError::Exhausted { attempts: attempt, last });
                }
                Err(_) => {
                    attempt += 1;
                    (self.sleeper)(self.delay_before(attempt));
                }
            }
        }
    }
}

impl RetryPolicy<RagError> {
    /// Retry only `TransientUpstream` failures.
    pub fn for_generation(max_attempts: u32, backoff: ExponentialBackoff) -> Self {
        Self::new(
            max_attempts,
            move |attempt| backoff.delay_before(attempt),
            RagError::is_transient,
        )
    }
}

impl Default for RetryPolicy<RagError> {
    fn default() -> Self {
        Self::for_generation(3, ExponentialBackoff::default())
    }
}

// ─── RetryConfig ──────────────────────────────────────────────────────────────
/// Serialisable form of the generation policy, as set from the CLI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts:       u32,
    pub backoff_multiplier: f64,
    pub backoff_cap:        f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, backoff_multiplier: 1.0, backoff_cap: 10.0 }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> Result<RetryPolicy<RagError>> {
        if self.max_attempts == 0 {
            return Err(RagError::config("max attempts must be at least 1"));
        }
        let secs = |value: f64, name: &str| {
            Duration::try_from_secs_f64(value)
                .map_err(|_| RagError::config(format!("{name} must be a non-negative number of seconds")))
        };
        let backoff = ExponentialBackoff::new(
            secs(self.backoff_multiplier, "backoff multiplier")?,
            secs(self.backoff_cap, "backoff cap")?,
        );
        Ok(RetryPolicy::for_generation(self.max_attempts, backoff))
    }
}

// ─── generate ─────────────────────────────────────────────────────────────────
/// Run `answer_fn` under `policy`. Returns the full answer or a
/// `RagError::Generation` carrying the last failure's description.
pub fn generate<F>(policy: &RetryPolicy<RagError>, query: &str, mut answer_fn: F) -> Result<String>
where
    F: FnMut() -> Result<String>,
{
    let outcome = policy.run(|attempt| {
        tracing::info!(attempt, max = policy.max_attempts(), "Processing query: {}", query);
        let result = answer_fn();
        if let Err(e) = &result {
            tracing::error!(attempt, transient = e.is_transient(), "Generation failed for '{}': {}", query, e);
            if e.is_transient() && attempt < policy.max_attempts() {
                tracing::warn!("Retrying '{}' in {:?}", query, policy.delay_before(attempt + 1));
            }
        }
        result
    });

    outcome.map_err(|err| {
        let attempts = err.attempts();
        let cause    = err.into_inner();
        tracing::error!("Giving up on '{}' after {} attempt(s): {}", query, attempts, cause);
        RagError::Generation { attempts, message: cause.to_string() }
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Default policy with the sleeps recorded instead of performed.
    fn recording_policy() -> (RetryPolicy<RagError>, Arc<Mutex<Vec<Duration>>>) {
        let slept  = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&slept);
        let policy = RetryPolicy::default().with_sleeper(move |d| record.lock().unwrap().push(d));
        (policy, slept)
    }

    #[test]
    fn test_transient_twice_then_success() {
        let (policy, slept) = recording_policy();
        let mut calls = 0;

        let answer = generate(&policy, "why fees?", || {
            calls += 1;
            if calls < 3 {
                Err(RagError::TransientUpstream("429 rate limited".into()))
            } else {
                Ok("Because of late payments.".into())
            }
        })
        .unwrap();

        assert_eq!(answer, "Because of late payments.");
        assert_eq!(calls, 3);
        assert_eq!(
            *slept.lock().unwrap(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn test_always_transient_exhausts_after_three() {
        let (policy, _) = recording_policy();
        let mut calls = 0;

        let err = generate(&policy, "q", || {
            calls += 1;
            Err(RagError::TransientUpstream(format!("503 on call {calls}")))
        })
        .unwrap_err();

        assert_eq!(calls, 3);
        match err {
            RagError::Generation { attempts, message } => {
                assert_eq!(attempts, 3);
                assert!(message.contains("503 on call 3"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_permanent_failure_is_not_retried() {
        let (policy, slept) = recording_policy();
        let mut calls = 0;

        let err = generate(&policy, "q", || {
            calls += 1;
            Err(RagError::Upstream("401 invalid api key".into()))
        })
        .unwrap_err();

        assert_eq!(calls, 1);
        assert!(slept.lock().unwrap().is_empty());
        assert!(matches!(err, RagError::Generation { attempts: 1, .. }));
    }

    #[test]
    fn test_backoff_schedule_is_capped() {
        let b = ExponentialBackoff::default();
        assert_eq!(b.delay_before(1), Duration::ZERO);
        assert_eq!(b.delay_before(2), Duration::from_secs(2));
        assert_eq!(b.delay_before(3), Duration::from_secs(4));
        assert_eq!(b.delay_before(4), Duration::from_secs(8));
        assert_eq!(b.delay_before(5), Duration::from_secs(10));
        assert_eq!(b.delay_before(60), Duration::from_secs(10));
    }

    #[test]
    fn test_retry_config_builds_policy() {
        let policy = RetryConfig::default().to_policy().unwrap();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_before(2), Duration::from_secs(2));

        let bad = RetryConfig { max_attempts: 0, ..RetryConfig::default() };
        assert!(matches!(bad.to_policy(), Err(RagError::Configuration(_))));
        let negative = RetryConfig { backoff_cap: -1.0, ..RetryConfig::default() };
        assert!(negative.to_policy().is_err());
    }

    #[test]
    fn test_generic_policy_with_custom_predicate() {
        let policy: RetryPolicy<&str> =
            RetryPolicy::new(5, |_| Duration::ZERO, |e: &&str| *e == "busy").with_sleeper(|_| {});
        let mut calls = 0;

        let result = policy.run(|attempt| {
            calls += 1;
            if attempt < 4 { Err("busy") } else { Ok(attempt) }
        });

        assert_eq!(result.unwrap(), 4);
        assert_eq!(calls, 4);
    }
}
