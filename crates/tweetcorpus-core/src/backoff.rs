//! Waiting: rate-limit wake times, exponential backoff, and the clock
//! the fetch loop sleeps on.

use std::time::Duration;

use chrono::{DateTime, Utc};
use indicatif::ProgressBar;

use crate::error::FetchError;
use crate::shutdown::is_shutdown_requested;

/// Longest uninterrupted slice of a [`SystemClock`] sleep
const SLEEP_SLICE: Duration = Duration::from_secs(1);

/// Shortest pause after an exhausted quota, even with a zero margin
pub const MIN_RATE_LIMIT_PAUSE: Duration = Duration::from_secs(5);

/// Source of time for the fetch loop.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

/// Wall clock. Sleeps in short slices and returns early once shutdown
/// is requested.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        let mut left = duration;
        while !left.is_zero() && !is_shutdown_requested() {
            let step = left.min(SLEEP_SLICE);
            std::thread::sleep(step);
            left -= step;
        }
    }
}

/// Exponential backoff: 2^attempt seconds (2s, 4s, 8s, ...)
pub const fn backoff_duration(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt))
}

/// When to retry after the quota ran out: the reset time plus a margin
/// for clock skew between us and the API.
pub fn rate_limit_wake_time(reset_at: DateTime<Utc>, margin: Duration) -> DateTime<Utc> {
    let margin = chrono::Duration::from_std(margin).unwrap_or_else(|_| chrono::Duration::zero());
    reset_at + margin
}

/// How long to pause after the quota ran out.
///
/// Normally until `reset_at + margin`. A reset time that is stale against
/// our clock still pauses for at least `margin` (and never less than
/// [`MIN_RATE_LIMIT_PAUSE`]), so a skewed server clock cannot turn the
/// wait into back-to-back requests.
pub fn rate_limit_pause(
    now: DateTime<Utc>,
    reset_at: DateTime<Utc>,
    margin: Duration,
) -> Duration {
    let wait = duration_until(now, rate_limit_wake_time(reset_at, margin));
    wait.max(margin.max(MIN_RATE_LIMIT_PAUSE))
}

/// Time left until `wake_at`; zero if it already passed.
pub fn duration_until(now: DateTime<Utc>, wake_at: DateTime<Utc>) -> Duration {
    (wake_at - now).to_std().unwrap_or(Duration::ZERO)
}

/// Retry a fetch call on transport failures with exponential backoff.
///
/// Non-retryable errors and the error after `max_retries` retries are
/// returned as-is. On success returns the value and the number of retries
/// it took.
pub fn retry_with_backoff<T>(
    label: &str,
    max_retries: u32,
    clock: &dyn Clock,
    pb: &ProgressBar,
    mut attempt_fn: impl FnMut() -> Result<T, FetchError>,
) -> Result<(T, u32), FetchError> {
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok((v, attempt)),
            Err(e) if attempt < max_retries && e.is_retryable() && !is_shutdown_requested() => {
                attempt += 1;
                let delay = backoff_duration(attempt);
                pb.set_message(format!("retry {attempt}/{max_retries}..."));
                log::warn!(
                    "{label}: attempt {attempt}/{max_retries} failed: {e}, retrying in {}s",
                    delay.as_secs()
                );
                clock.sleep(delay);
            }
            Err(e) => {
                log::error!("{label}: failed permanently: {e}");
                return Err(e);
            }
        }
    }
}
