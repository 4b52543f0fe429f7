// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>
//! # Design: Bounded Worker Pool (threads)
//!
//! ## Overview
//! Decouples submitting jobs from running them. At most `max_workers` jobs run
//! at the same time, each on its own long-lived worker thread.
//!
//! - Submitted jobs enter a bounded FIFO queue (a full queue blocks the producer).
//! - Idle workers advertise a handle in the registry, a channel with room for
//!   exactly one handle per worker.
//! - The dispatch loop runs on its own thread. It pairs the oldest queued job
//!   with the next advertised worker, optionally paced by a rate limiter.
//! - Every wait in the dispatch loop also listens for shutdown.
//! - Shutdown queues a stop request behind each worker's current job and waits
//!   for all workers to exit. Nothing spins.
//!
//! ```text
//!         submit(job)
//!              |
//!              v
//!     +-----------------+        +--------------------+
//!     |    job queue    |        |  worker registry   |<---------+
//!     | (bounded, FIFO) |        | (idle handles, <=N)|          |
//!     +--------+--------+        +---------+----------+          |
//!              |                           |                     |
//!              +-----------+   +-----------+                     |
//!                          v   v                                 |
//!                   +---------------+   tick   +--------------+  |
//!                   | dispatch loop |<---------| rate limiter |  |
//!                   +-------+-------+          +--------------+  |
//!                           | hand over (one job)                |
//!                           v                                    |
//!              +---------+  +---------+  +---------+             |
//!              | worker 0|  | worker 1|  | worker N|-- advertise-+
//!              +---------+  +---------+  +---------+
//! ```
//!
//! ## Ordering
//! Jobs leave the queue in submission order and are handed over in that order.
//! Completion order is whatever the workers make of it.

pub mod closure_job;
pub mod dispatcher;
pub mod job;
pub mod rate_limiter;
pub mod wait_group;
pub mod worker;
