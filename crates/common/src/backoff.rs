use rand::Rng;
use std::time::Duration;

/// Doubling delay schedule with symmetric jitter.
///
/// Used for stream reconnects (1s..60s) and, through [`crate::RetryPolicy`],
/// for REST retries. The `n`-th delay is `base * 2^n` capped at `max_delay`,
/// then moved by a random amount of at most `jitter_factor` times itself.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max_delay: Duration,
    jitter_factor: f64,
    attempt: u32,
}

impl Default for ExponentialBackoff {
    /// Reconnect schedule: 1s, 2s, 4s ... 60s, 10% jitter.
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60), 0.1)
    }
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max_delay: Duration, jitter_factor: f64) -> Self {
        Self {
            base,
            max_delay,
            jitter_factor: jitter_factor.max(0.0),
            attempt: 0,
        }
    }

    /// No jitter.
    pub fn fixed(base: Duration, max_delay: Duration) -> Self {
        Self::new(base, max_delay, 0.0)
    }

    /// Same schedule, counter back at zero.
    pub fn restarted(&self) -> Self {
        Self {
            attempt: 0,
            ..self.clone()
        }
    }

    fn capped(&self) -> Duration {
        self.base
            .saturating_mul(2u32.saturating_pow(self.attempt))
            .min(self.max_delay)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        let spread = delay.as_secs_f64() * self.jitter_factor;
        if spread <= 0.0 {
            return delay;
        }
        let offset = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_secs_f64((delay.as_secs_f64() + offset).max(0.0))
    }

    /// Delay before the next attempt; advances the counter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.jittered(self.capped());
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Upper bound of the schedule, before jitter.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_reconnect_schedule_doubles_up_to_cap() {
        let mut backoff = ExponentialBackoff::fixed(secs(1), secs(60));
        let delays: Vec<_> = (0..8).map(|_| backoff.next_delay()).collect();
        assert_eq!(
            delays,
            vec![secs(1), secs(2), secs(4), secs(8), secs(16), secs(32), secs(60), secs(60)]
        );
        assert_eq!(backoff.attempt(), 8);
    }

    #[test]
    fn test_rest_retry_schedule() {
        let mut backoff = ExponentialBackoff::fixed(Duration::from_millis(200), secs(5));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        for _ in 0..10 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), secs(5));
    }

    #[test]
    fn test_counter_survives_many_failures() {
        let mut backoff = ExponentialBackoff::fixed(secs(1), secs(60));
        for _ in 0..100 {
            assert!(backoff.next_delay() <= secs(60));
        }
    }

    #[test]
    fn test_reset_after_stable_connection() {
        let mut backoff = ExponentialBackoff::fixed(secs(1), secs(60));
        backoff.next_delay();
        backoff.next_delay();
        backoff.next_delay();

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), secs(1));
    }

    #[test]
    fn test_restarted_leaves_original_untouched() {
        let mut backoff = ExponentialBackoff::fixed(Duration::from_millis(10), secs(1));
        backoff.next_delay();
        backoff.next_delay();

        let mut fresh = backoff.restarted();
        assert_eq!(fresh.next_delay(), Duration::from_millis(10));
        assert_eq!(backoff.attempt(), 2);
    }

    #[test]
    fn test_jitter_stays_within_factor() {
        let mut backoff = ExponentialBackoff::new(secs(10), secs(60), 0.2);
        let first = backoff.next_delay().as_secs_f64();
        assert!((8.0..=12.0).contains(&first), "delay was {first}");
    }

    #[test]
    fn test_negative_jitter_is_ignored() {
        let mut backoff = ExponentialBackoff::new(secs(3), secs(60), -0.5);
        assert_eq!(backoff.next_delay(), secs(3));
    }
}
