// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts jobs while they run and remembers the highest overlap seen.
#[derive(Debug, Default)]
pub struct Occupancy {
    current: AtomicUsize,
    peak: AtomicUsize,
    executed: AtomicUsize,
}

impl Occupancy {
    pub fn track<R>(&self, f: impl FnOnce() -> R) -> R {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let result = f();
        self.current.fetch_sub(1, Ordering::SeqCst);
        self.executed.fetch_add(1, Ordering::SeqCst);
        result
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }
}
