// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

//! Identifier sources handed to job construction.
//!
//! The dispatcher never generates identifiers itself. Whoever builds a [`Job`]
//! passes in the source, so tests can use predictable ids and services can
//! share one generator without any process-wide state.
//!
//! [`Job`]: crate::job_engine::job::Job

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

pub trait IdSource: Send + Sync {
    /// Returns a fresh identifier. Every call must return a different value.
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// `<prefix>-<n>` with a monotonically increasing `n`, starting at 1.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

impl<F> IdSource for F
where
    F: Fn() -> String + Send + Sync,
{
    fn next_id(&self) -> String {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn sequential_ids_are_prefixed_and_increasing() {
        let ids = SequentialIds::new("job");
        assert_eq!(ids.next_id(), "job-1");
        assert_eq!(ids.next_id(), "job-2");
        assert_eq!(ids.issued(), 2);
    }

    #[test]
    fn sequential_ids_are_unique_across_threads() {
        let ids = Arc::new(SequentialIds::new("t"));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = ids.clone();
                thread::spawn(move || (0..250).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id");
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn uuid_ids_parse_as_uuids() {
        let id = UuidIds.next_id();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_ne!(id, UuidIds.next_id());
    }

    #[test]
    fn closures_are_id_sources() {
        let source = || "fixed".to_string();
        assert_eq!(source.next_id(), "fixed");
    }
}
