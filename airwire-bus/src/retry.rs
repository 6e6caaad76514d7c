//! Bounded polling
//!
//! A [`Retry`] is the single timeout policy used for clock stretching: poll a
//! condition up to `attempts` times, sleeping `interval_ms` after each miss.

use embedded_hal::delay::DelayNs;

/// Bounded retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Retry {
    /// Maximum number of polls (at least 1)
    pub attempts: u32,
    /// Sleep after each unsuccessful poll
    pub interval_ms: u32,
}

impl Retry {
    pub const fn new(attempts: u32, interval_ms: u32) -> Self {
        Self {
            attempts: if attempts == 0 { 1 } else { attempts },
            interval_ms,
        }
    }

    /// Policy that waits roughly `total_ms` in steps of `interval_ms`
    ///
    /// The attempt count is rounded up, so the total wait never falls short
    /// of `total_ms`. A zero interval degenerates to a single poll.
    pub fn for_timeout(total_ms: u32, interval_ms: u32) -> Self {
        if interval_ms == 0 {
            return Self::new(1, 0);
        }
        Self::new(total_ms.div_ceil(interval_ms), interval_ms)
    }

    /// Upper bound on the time spent sleeping
    pub fn budget_ms(&self) -> u32 {
        self.attempts.saturating_mul(self.interval_ms)
    }

    /// Poll until `poll` yields a value or attempts run out
    ///
    /// Returns `Ok(None)` on exhaustion. Errors from `poll` end the loop
    /// immediately.
    pub fn run<T, E, D, F>(&self, delay: &mut D, mut poll: F) -> Result<Option<T>, E>
    where
        D: DelayNs,
        F: FnMut() -> Result<Option<T>, E>,
    {
        for _ in 0..self.attempts {
            if let Some(value) = poll()? {
                return Ok(Some(value));
            }
            delay.delay_ms(self.interval_ms);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimDelay;

    #[test]
    fn test_for_timeout_rounds_up() {
        assert_eq!(Retry::for_timeout(150, 2).attempts, 75);
        assert_eq!(Retry::for_timeout(150, 4).attempts, 38);
        assert_eq!(Retry::for_timeout(150, 7).attempts, 22);
        assert!(Retry::for_timeout(150, 7).budget_ms() >= 150);
    }

    #[test]
    fn test_for_timeout_minimum_one_attempt() {
        assert_eq!(Retry::for_timeout(0, 2).attempts, 1);
        assert_eq!(Retry::for_timeout(150, 0).attempts, 1);
        assert_eq!(Retry::for_timeout(150, 1000).attempts, 1);
        assert_eq!(Retry::new(0, 5).attempts, 1);
    }

    #[test]
    fn test_run_succeeds_on_later_attempt() {
        let mut delay = SimDelay::new();
        let mut polls = 0;
        let result: Result<Option<u32>, ()> = Retry::new(5, 2).run(&mut delay, || {
            polls += 1;
            Ok(if polls == 3 { Some(polls) } else { None })
        });
        assert_eq!(result, Ok(Some(3)));
        assert_eq!(delay.elapsed_ms(), 4);
    }

    #[test]
    fn test_run_exhausts() {
        let mut delay = SimDelay::new();
        let mut polls = 0;
        let result: Result<Option<()>, ()> = Retry::new(4, 3).run(&mut delay, || {
            polls += 1;
            Ok(None)
        });
        assert_eq!(result, Ok(None));
        assert_eq!(polls, 4);
        assert_eq!(delay.elapsed_ms(), 12);
    }

    #[test]
    fn test_run_error_stops_immediately() {
        let mut delay = SimDelay::new();
        let mut polls = 0;
        let result: Result<Option<()>, &str> = Retry::new(10, 1).run(&mut delay, || {
            polls += 1;
            Err("bad pin")
        });
        assert_eq!(result, Err("bad pin"));
        assert_eq!(polls, 1);
        assert_eq!(delay.elapsed_ms(), 0);
    }
}
