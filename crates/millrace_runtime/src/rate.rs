//! Leaky-bucket rate limiter.
//!
//! Allowance is tracked in operations scaled by 2^32 and advanced with
//! drift-free integer arithmetic: permitted operations over any interval
//! T never exceed rate×T plus one burst credit, including across
//! mid-stream rate changes. The allowance floor is zero and the ceiling
//! one operation.

use millrace_core::Timestamp;

/// One full operation of allowance, fixed point
const ONE: u64 = 1 << 32;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Leaky-bucket admission gate, mutated only by its owning element.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    rate: u64,
    allowance: u64,
    updated: Timestamp,
}

impl RateLimiter {
    /// Create a limiter at `rate` operations per second, starting with
    /// one burst credit
    #[must_use]
    pub fn new(rate: u64, now: Timestamp) -> Self {
        Self {
            rate,
            allowance: ONE,
            updated: now,
        }
    }

    /// Current rate in operations per second
    #[must_use]
    pub fn rate(&self) -> u64 {
        self.rate
    }

    /// Allowance as of `now`, capped at one operation
    fn settled(&self, now: Timestamp) -> u64 {
        if now <= self.updated {
            return self.allowance;
        }
        let elapsed = now.duration_since(&self.updated);
        if elapsed.as_secs() >= 1 && self.rate >= 1 {
            // a full second always refills the bucket
            return ONE;
        }
        let delta = elapsed.as_nanos() * self.rate as u128 * ONE as u128 / NANOS_PER_SEC;
        (self.allowance as u128 + delta).min(ONE as u128) as u64
    }

    /// Read-only check: is the next operation currently permitted?
    #[must_use]
    pub fn need_update(&self, now: Timestamp) -> bool {
        self.settled(now) >= ONE
    }

    /// Commit consumption of one unit and advance the internal clock.
    ///
    /// Saturates at zero allowance if called without a permit.
    pub fn update(&mut self, now: Timestamp) {
        self.allowance = self.settled(now).saturating_sub(ONE);
        self.updated = self.updated.max(now);
    }

    /// Change the rate without resetting accumulated allowance.
    ///
    /// Settles the allowance at the old rate up to `now` first, so the
    /// change is fair across rate boundaries.
    pub fn set_rate(&mut self, now: Timestamp, rate: u64) {
        self.allowance = self.settled(now);
        self.updated = self.updated.max(now);
        self.rate = rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use millrace_core::Duration;

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn test_starts_with_one_burst_credit() {
        let mut limiter = RateLimiter::new(10, at(0));
        assert!(limiter.need_update(at(0)));
        limiter.update(at(0));
        assert!(!limiter.need_update(at(0)));
    }

    #[test]
    fn test_refills_at_rate() {
        let mut limiter = RateLimiter::new(10, at(0));
        limiter.update(at(0));

        assert!(!limiter.need_update(at(50)));
        assert!(limiter.need_update(at(100)));
        limiter.update(at(100));
        assert!(!limiter.need_update(at(150)));
    }

    #[test]
    fn test_allowance_caps_at_one_operation() {
        let mut limiter = RateLimiter::new(10, at(0));
        // idle for ten seconds; still only one stored credit
        limiter.update(at(10_000));
        assert!(!limiter.need_update(at(10_000)));
        assert!(limiter.need_update(at(10_100)));
    }

    #[test]
    fn test_uniform_attempts_scenario() {
        // 10 ops/sec, 100 attempts spread uniformly over 5 seconds:
        // at most 50 + 1 burst permits
        let mut limiter = RateLimiter::new(10, at(0));
        let mut permitted = 0u32;
        for i in 0..100u64 {
            let now = at(i * 50);
            if limiter.need_update(now) {
                limiter.update(now);
                permitted += 1;
            }
        }
        assert!(permitted <= 51, "permitted {permitted} > 51");
        assert_eq!(permitted, 50);
    }

    #[test]
    fn test_set_rate_preserves_allowance() {
        let mut limiter = RateLimiter::new(1, at(0));
        limiter.update(at(0));

        // 500 ms at 1 op/s: half a credit accumulated
        limiter.set_rate(at(500), 1_000);
        assert_eq!(limiter.rate(), 1_000);
        // the stored half credit plus 0.5 ms at the new rate
        assert!(limiter.need_update(at(500).add(Duration::from_millis(1))));
        // but not instantly: the old accumulation was not reset upward
        assert!(!limiter.need_update(at(500)));
    }

    #[test]
    fn test_zero_rate_never_refills() {
        let mut limiter = RateLimiter::new(0, at(0));
        limiter.update(at(0)); // spends the initial burst credit
        assert!(!limiter.need_update(at(1_000_000)));
    }

    #[test]
    fn test_update_without_permit_floors_at_zero() {
        let mut limiter = RateLimiter::new(10, at(0));
        limiter.update(at(0));
        limiter.update(at(0));
        limiter.update(at(0));
        // still refills on the normal schedule, not later
        assert!(limiter.need_update(at(100)));
    }
}
