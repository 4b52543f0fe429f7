// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::debug;
use workpool::{IdSource, Job};

use crate::occupancy::Occupancy;

#[derive(Debug, Clone)]
pub struct Ping {
    pub seq: usize,
    pub hold: Duration,
}

/// Builds a message job that delivers a [`Ping`] to a recipient which holds
/// the worker for `ping.hold`.
pub fn ping_job(ids: &dyn IdSource, ping: Ping, occupancy: Arc<Occupancy>) -> Job {
    Job::message(ids, ping, move |ping: Ping| {
        occupancy.track(|| thread::sleep(ping.hold));
        debug!("ping {} delivered", ping.seq);
    })
}
