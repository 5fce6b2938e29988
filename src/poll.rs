//! Blocking poll-until-converged loop
//!
//! [`wait_until`] evaluates a predicate immediately, then once per profile
//! interval, until a matcher accepts the value or the profile timeout has
//! elapsed since the first evaluation. The loop runs on the caller's task
//! and owns no shared state, so concurrent waits are independent.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::WaitError;

/// Interval and patience of a poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollProfile {
    /// Delay between two evaluations
    pub interval: Duration,
    /// Deadline measured from the first evaluation
    pub timeout: Duration,
}

impl PollProfile {
    /// Steady-state condition checks
    pub const STANDARD: PollProfile = PollProfile {
        interval: Duration::from_secs(2),
        timeout: Duration::from_secs(60),
    };

    /// Fast-changing state during an induced failure; polls often enough to
    /// catch short-lived intermediate states
    pub const FAILOVER: PollProfile = PollProfile {
        interval: Duration::from_millis(200),
        timeout: Duration::from_secs(120),
    };

    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Look up a preset by name (`standard` or `failover`)
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::STANDARD),
            "failover" => Some(Self::FAILOVER),
            _ => None,
        }
    }

    /// Same interval with a different deadline
    pub const fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            interval: self.interval,
            timeout,
        }
    }
}

impl Default for PollProfile {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Boolean test over a polled value
///
/// Implemented for every `Fn(&T) -> bool`, so closures can be passed
/// directly.
pub trait Matcher<T> {
    fn matches(&self, value: &T) -> bool;

    /// Matcher accepting what this one rejects
    fn not(self) -> Not<Self>
    where
        Self: Sized,
    {
        Not(self)
    }

    /// Matcher accepting only when both matchers accept
    fn and<M: Matcher<T>>(self, other: M) -> And<Self, M>
    where
        Self: Sized,
    {
        And(self, other)
    }
}

impl<T, F: Fn(&T) -> bool> Matcher<T> for F {
    fn matches(&self, value: &T) -> bool {
        self(value)
    }
}

pub struct Not<M>(M);

impl<T, M: Matcher<T>> Matcher<T> for Not<M> {
    fn matches(&self, value: &T) -> bool {
        !self.0.matches(value)
    }
}

pub struct And<A, B>(A, B);

impl<T, A: Matcher<T>, B: Matcher<T>> Matcher<T> for And<A, B> {
    fn matches(&self, value: &T) -> bool {
        self.0.matches(value) && self.1.matches(value)
    }
}

/// `last_observed` of a timeout where no evaluation ever completed
pub const NOTHING_OBSERVED: &str = "<no completed evaluation>";

/// Poll `predicate` until `matcher` accepts its value
///
/// Returns the accepted value, or [`WaitError::Timeout`] carrying
/// `description` and the last observed value once `profile.timeout` has
/// elapsed. A failing wait returns after at least `timeout` and before
/// `timeout + interval`, however long a single evaluation takes: each one is
/// cut off at [`evaluation_deadline`] and counts as a missed tick.
pub async fn wait_until<T, P, Fut, M>(
    profile: PollProfile,
    description: impl Into<String>,
    mut predicate: P,
    matcher: M,
) -> Result<T, WaitError>
where
    T: Debug,
    P: FnMut() -> Fut,
    Fut: Future<Output = T>,
    M: Matcher<T>,
{
    let description = description.into();
    let start = Instant::now();
    let deadline = start + profile.timeout;
    let mut attempts: u32 = 0;
    let mut last_observed: Option<T> = None;

    loop {
        attempts += 1;
        let cutoff = evaluation_deadline(Instant::now(), deadline, profile.interval);

        match tokio::time::timeout_at(cutoff, predicate()).await {
            Ok(value) if matcher.matches(&value) => {
                tracing::info!(
                    attempts = attempts,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "{}: satisfied",
                    description
                );
                return Ok(value);
            }
            Ok(value) => {
                tracing::debug!(attempt = attempts, observed = ?value, "Condition not met yet");
                last_observed = Some(value);
            }
            Err(_) => {
                tracing::debug!(
                    attempt = attempts,
                    "Evaluation did not finish before the poll deadline"
                );
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= profile.timeout {
            tracing::warn!(
                attempts = attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                "{}: timed out",
                description
            );
            return Err(WaitError::Timeout {
                description,
                elapsed,
                attempts,
                last_observed: last_observed
                    .map_or_else(|| NOTHING_OBSERVED.to_string(), |v| format!("{:?}", v)),
            });
        }

        tokio::time::sleep(profile.interval).await;
    }
}

/// Latest instant an evaluation starting at `now` may run until
///
/// Before the deadline that is the deadline itself. An evaluation started
/// past it (the last tick after a sleep) gets half of what remains until
/// `deadline + interval`, so the wait always ends strictly before that.
pub fn evaluation_deadline(now: Instant, deadline: Instant, interval: Duration) -> Instant {
    if now < deadline {
        deadline
    } else {
        let hard_end = deadline + interval;
        now + hard_end.saturating_duration_since(now) / 2
    }
}
