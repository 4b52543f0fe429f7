// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::time::{Duration, Instant};

use async_io::Timer;

/// Paces dispatches to at most one per interval.
///
/// The first tick is due one interval after construction. A consumer that
/// comes back late gets one tick right away and the next one a full interval
/// later, so missed ticks never pile up into a burst.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next: Instant,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now() + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits for the next tick and returns when it fired.
    ///
    /// Dropping the future before it completes leaves the schedule untouched.
    pub async fn tick(&mut self) -> Instant {
        let now = Instant::now();
        let fired = if now < self.next {
            Timer::at(self.next).await
        } else {
            now
        };
        self.next = fired.max(self.next) + self.interval;
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::thread;

    #[test]
    fn first_tick_waits_one_interval() {
        let start = Instant::now();
        let mut limiter = RateLimiter::new(Duration::from_millis(30));
        block_on(limiter.tick());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn ticks_are_spaced_by_interval() {
        let interval = Duration::from_millis(20);
        let mut limiter = RateLimiter::new(interval);
        let ticks: Vec<Instant> = (0..4).map(|_| block_on(limiter.tick())).collect();

        for pair in ticks.windows(2) {
            assert!(pair[1] - pair[0] >= interval);
        }
    }

    #[test]
    fn late_consumer_does_not_get_a_burst() {
        let interval = Duration::from_millis(20);
        let mut limiter = RateLimiter::new(interval);
        thread::sleep(interval * 5);

        let first = block_on(limiter.tick());
        let second = block_on(limiter.tick());
        assert!(second - first >= interval);
    }
}
