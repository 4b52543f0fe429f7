// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use workpool::{IdSource, Job};

/// Records how many instrumented jobs run at the same time.
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    high_water: AtomicUsize,
    finished: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A job that holds its worker for `hold` while being counted.
    pub fn job(self: &Arc<Self>, ids: &dyn IdSource, hold: Duration) -> Job {
        let gauge = self.clone();
        Job::from_fn(ids, "gauge", move || {
            let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
            gauge.high_water.fetch_max(now, Ordering::SeqCst);
            thread::sleep(hold);
            gauge.current.fetch_sub(1, Ordering::SeqCst);
            gauge.finished.fetch_add(1, Ordering::SeqCst);
        })
    }

    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn running(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }
}
