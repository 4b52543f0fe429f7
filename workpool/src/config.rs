// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::time::Duration;

use crate::error::{DispatchError, Result};
use crate::job_engine::wait_group::WaitGroup;

pub const DEFAULT_THREAD_NAME: &str = "workpool";

/// Construction parameters of a [`Dispatcher`](crate::job_engine::dispatcher::Dispatcher).
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of worker threads, fixed for the dispatcher's lifetime.
    pub max_workers: usize,
    /// Jobs that may wait in the queue. 0 makes `submit` a synchronous hand-off.
    pub queue_capacity: usize,
    /// Minimum gap between two dispatches.
    pub rate_limit: Option<Duration>,
    /// Counts submitted but unfinished jobs. `None` disables `wait()`.
    pub completion: Option<WaitGroup>,
    /// Prefix for the names of the threads the dispatcher spawns.
    pub thread_name: String,
}

impl DispatcherConfig {
    pub fn new(max_workers: usize, queue_capacity: usize) -> Self {
        Self {
            max_workers,
            queue_capacity,
            rate_limit: None,
            completion: None,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }

    pub fn with_rate_limit(mut self, interval: Duration) -> Self {
        self.rate_limit = Some(interval);
        self
    }

    /// Tracks completion with a wait group owned by the dispatcher.
    pub fn with_completion_tracking(self) -> Self {
        self.with_wait_group(WaitGroup::new())
    }

    /// Tracks completion with a wait group the caller shares, so other code can
    /// wait on the same jobs without holding the dispatcher.
    pub fn with_wait_group(mut self, wait_group: WaitGroup) -> Self {
        self.completion = Some(wait_group);
        self
    }

    pub fn with_thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    pub fn is_unbuffered(&self) -> bool {
        self.queue_capacity == 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(DispatchError::InvalidConfig(
                "max_workers must be at least 1".into(),
            ));
        }
        if self.rate_limit == Some(Duration::ZERO) {
            return Err(DispatchError::InvalidConfig(
                "rate limit interval must not be zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4);
        Self::new(workers, workers * 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_is_rejected() {
        let err = DispatcherConfig::new(0, 10).validate().unwrap_err();
        assert!(matches!(err, DispatchError::InvalidConfig(_)));
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let err = DispatcherConfig::new(1, 0)
            .with_rate_limit(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidConfig(_)));
    }

    #[test]
    fn unbuffered_queue_is_valid() {
        let config = DispatcherConfig::new(1, 0);
        assert!(config.is_unbuffered());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_sets_options() {
        let shared = WaitGroup::new();
        let config = DispatcherConfig::new(3, 5)
            .with_rate_limit(Duration::from_millis(10))
            .with_wait_group(shared.clone())
            .with_thread_name("ingest");

        assert_eq!(config.rate_limit, Some(Duration::from_millis(10)));
        assert_eq!(config.thread_name, "ingest");
        shared.add(1);
        assert_eq!(config.completion.as_ref().map(WaitGroup::count), Some(1));
    }

    #[test]
    fn default_has_at_least_one_worker() {
        let config = DispatcherConfig::default();
        assert!(config.max_workers >= 1);
        assert!(config.completion.is_none());
    }
}
