// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::{Arc, Mutex};
use std::time::Instant;

use workpool::{IdSource, Job};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Start(usize),
    End(usize),
}

/// An ordered record of when labelled jobs started and ended.
#[derive(Debug, Default)]
pub struct Timeline {
    events: Mutex<Vec<(Mark, Instant)>>,
}

impl Timeline {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, mark: Mark) {
        self.events.lock().unwrap().push((mark, Instant::now()));
    }

    /// A job that records its start and end around `body`.
    pub fn job<F>(self: &Arc<Self>, ids: &dyn IdSource, label: usize, body: F) -> Job
    where
        F: FnOnce() + Send + 'static,
    {
        let timeline = self.clone();
        Job::from_fn(ids, format!("timeline #{label}"), move || {
            timeline.record(Mark::Start(label));
            body();
            timeline.record(Mark::End(label));
        })
    }

    pub fn marks(&self) -> Vec<Mark> {
        self.events.lock().unwrap().iter().map(|(m, _)| *m).collect()
    }

    /// Start instants in recording order.
    pub fn starts(&self) -> Vec<Instant> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| matches!(m, Mark::Start(_)))
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn position(&self, mark: Mark) -> Option<usize> {
        self.marks().iter().position(|m| *m == mark)
    }
}
