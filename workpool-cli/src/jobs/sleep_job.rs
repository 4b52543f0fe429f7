// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::debug;
use workpool::Task;

use crate::occupancy::Occupancy;

/// Simulates a CPU- or IO-bound job by sleeping.
pub struct SleepJob {
    name: String,
    duration: Duration,
    occupancy: Arc<Occupancy>,
}

impl SleepJob {
    pub fn new(seq: usize, duration: Duration, occupancy: Arc<Occupancy>) -> Self {
        Self {
            name: format!("sleep #{seq}"),
            duration,
            occupancy,
        }
    }
}

impl Task for SleepJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(self: Box<Self>) {
        self.occupancy.track(|| thread::sleep(self.duration));
        debug!("{} done", self.name);
    }
}
