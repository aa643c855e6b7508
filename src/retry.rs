//! Retry/backoff policy for reconnection and caller-level retries.
//!
//! The teacher declares a `tokio_retry` dependency and carries a bare
//! `retry_backoff: Duration` field on `consumer::coordinator::Coordinator`
//! without building a real strategy object around it. `tokio-retry`'s
//! `Strategy` iterators are a plain `attempt -> delay` sequence with no
//! notion of elapsed time or a deadline, so they cover `FixedAttempts`'s
//! trivial zero-delay case (`FixedInterval`) directly, but not spec.md
//! §4.F's full `next_delay(attempt, elapsed)` contract, which needs
//! `elapsed` to cut a retry off against a deadline mid-backoff. `Backoff`'s
//! linear/exponential math is therefore computed directly against
//! `std::time::Duration`.

use std::time::Duration;

use tokio_retry::strategy::FixedInterval;

/// A reusable, stateless policy. `next_delay` is pure: the same
/// `(attempt, elapsed)` pair always yields the same answer.
#[derive(Clone, Debug)]
pub enum RetryPolicy {
    /// Zero delay until `max_attempts` is reached, then give up.
    FixedAttempts { max_attempts: u32 },
    /// Linear or exponential backoff with an optional cap and deadline.
    Backoff {
        delay: Duration,
        linear: bool,
        max_delay: Option<Duration>,
        timeout: Option<Duration>,
    },
}

impl RetryPolicy {
    pub fn fixed_attempts(max_attempts: u32) -> Self {
        RetryPolicy::FixedAttempts { max_attempts }
    }

    pub fn linear(delay: Duration, max_delay: Option<Duration>, timeout: Option<Duration>) -> Self {
        RetryPolicy::Backoff { delay, linear: true, max_delay, timeout }
    }

    pub fn exponential(delay: Duration, max_delay: Option<Duration>, timeout: Option<Duration>) -> Self {
        RetryPolicy::Backoff { delay, linear: false, max_delay, timeout }
    }

    /// Returns the delay to wait before attempt `attempt + 1` (0-indexed),
    /// given `elapsed` time since the first attempt. `None` means give up.
    pub fn next_delay(&self, attempt: u32, elapsed: Duration) -> Option<Duration> {
        match *self {
            RetryPolicy::FixedAttempts { max_attempts } => {
                if attempt >= max_attempts {
                    None
                } else {
                    FixedInterval::new(Duration::from_secs(0)).next()
                }
            }
            RetryPolicy::Backoff { delay, linear, max_delay, timeout } => {
                if let Some(timeout) = timeout {
                    if elapsed >= timeout {
                        return None;
                    }
                }

                let mut raw = if linear {
                    delay.saturating_mul(attempt + 1)
                } else {
                    let factor = 1u64.checked_shl(attempt + 1).unwrap_or(u64::MAX).saturating_sub(1);
                    Duration::from_nanos((delay.as_nanos() as u64 / 2).saturating_mul(factor))
                };

                if let Some(max_delay) = max_delay {
                    raw = raw.min(max_delay);
                }

                if let Some(timeout) = timeout {
                    let remaining = timeout.saturating_sub(elapsed);
                    raw = raw.min(remaining);
                }

                Some(raw)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_attempts_gives_up_at_bound() {
        let policy = RetryPolicy::fixed_attempts(3);
        assert!(policy.next_delay(0, Duration::ZERO).is_some());
        assert!(policy.next_delay(2, Duration::ZERO).is_some());
        assert!(policy.next_delay(3, Duration::ZERO).is_none());
    }

    #[test]
    fn linear_backoff_scales_with_attempt() {
        let policy = RetryPolicy::linear(Duration::from_millis(100), None, None);
        assert_eq!(policy.next_delay(0, Duration::ZERO), Some(Duration::from_millis(100)));
        assert_eq!(policy.next_delay(1, Duration::ZERO), Some(Duration::from_millis(200)));
    }

    #[test]
    fn exponential_backoff_doubles() {
        let policy = RetryPolicy::exponential(Duration::from_millis(100), None, None);
        // delay/2 * (2^(attempt+1) - 1): attempt=0 -> 50*1=50ms, attempt=1 -> 50*3=150ms
        assert_eq!(policy.next_delay(0, Duration::ZERO), Some(Duration::from_millis(50)));
        assert_eq!(policy.next_delay(1, Duration::ZERO), Some(Duration::from_millis(150)));
    }

    #[test]
    fn timeout_cuts_off_retries() {
        let policy = RetryPolicy::linear(Duration::from_secs(1), None, Some(Duration::from_secs(5)));
        assert!(policy.next_delay(0, Duration::from_secs(5)).is_none());
    }

    #[test]
    fn max_delay_caps_growth() {
        let policy = RetryPolicy::exponential(
            Duration::from_millis(100),
            Some(Duration::from_millis(120)),
            None,
        );
        assert_eq!(policy.next_delay(5, Duration::ZERO), Some(Duration::from_millis(120)));
    }
}
