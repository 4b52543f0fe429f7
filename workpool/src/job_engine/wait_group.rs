// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use log::warn;

/// A counter that threads can wait on until it drops to zero.
///
/// Clones share the same counter. The dispatcher uses one to track submitted
/// but unfinished jobs and another to track workers that have not exited yet.
#[derive(Clone, Default)]
pub struct WaitGroup {
    inner: Arc<(Mutex<usize>, Condvar)>,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: usize) {
        let (lock, _) = &*self.inner;
        let mut count = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *count += n;
    }

    /// Decrements the counter and wakes all waiters once it reaches zero.
    pub fn done(&self) {
        let (lock, cvar) = &*self.inner;
        let mut count = lock.lock().unwrap_or_else(PoisonError::into_inner);
        if *count == 0 {
            warn!("WaitGroup::done called more often than add");
            return;
        }
        *count -= 1;
        if *count == 0 {
            cvar.notify_all();
        }
    }

    pub fn count(&self) -> usize {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until the counter is zero. Returns immediately if it already is.
    pub fn wait(&self) {
        let (lock, cvar) = &*self.inner;
        let count = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _zero = cvar
            .wait_while(count, |count| *count > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Returns a guard that calls [`done`](Self::done) when dropped, also while unwinding.
    pub(crate) fn done_on_drop(&self) -> DoneGuard {
        DoneGuard(self.clone())
    }
}

impl fmt::Debug for WaitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitGroup")
            .field("count", &self.count())
            .finish()
    }
}

pub(crate) struct DoneGuard(WaitGroup);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_on_zero_returns_immediately() {
        WaitGroup::new().wait();
    }

    #[test]
    fn wait_returns_after_all_done() {
        let wg = WaitGroup::new();
        let finished = Arc::new(AtomicUsize::new(0));
        wg.add(8);

        for _ in 0..8 {
            let wg = wg.clone();
            let finished = finished.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                finished.fetch_add(1, Ordering::SeqCst);
                wg.done();
            });
        }

        wg.wait();
        assert_eq!(finished.load(Ordering::SeqCst), 8);
        assert_eq!(wg.count(), 0);
    }

    #[test]
    fn done_does_not_underflow() {
        let wg = WaitGroup::new();
        wg.done();
        assert_eq!(wg.count(), 0);
        wg.add(1);
        assert_eq!(wg.count(), 1);
    }

    #[test]
    fn guard_counts_down_when_thread_panics() {
        let wg = WaitGroup::new();
        wg.add(1);
        let guard = wg.done_on_drop();
        let result = thread::spawn(move || {
            let _guard = guard;
            panic!("intentional test panic");
        })
        .join();

        assert!(result.is_err());
        wg.wait();
    }
}
