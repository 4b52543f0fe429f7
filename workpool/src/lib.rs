// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

//! A bounded worker-pool dispatcher: a fixed set of worker threads, a bounded
//! FIFO job queue, optional dispatch pacing and optional completion tracking.
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! use workpool::{Dispatcher, DispatcherConfig, Job, SequentialIds};
//!
//! let ids = SequentialIds::new("job");
//! let dispatcher = Dispatcher::new(DispatcherConfig::new(2, 4).with_completion_tracking())?;
//! dispatcher.start()?;
//!
//! let ran = Arc::new(AtomicUsize::new(0));
//! for _ in 0..8 {
//!     let ran = ran.clone();
//!     dispatcher.submit(Job::from_fn(&ids, "count", move || {
//!         ran.fetch_add(1, Ordering::SeqCst);
//!     }))?;
//! }
//!
//! dispatcher.wait();
//! dispatcher.stop();
//! assert_eq!(ran.load(Ordering::SeqCst), 8);
//! # Ok::<(), workpool::DispatchError>(())
//! ```

pub mod config;
pub mod error;
pub mod ids;
pub mod job_engine;

pub use config::DispatcherConfig;
pub use error::{DispatchError, Result};
pub use ids::{IdSource, SequentialIds, UuidIds};
pub use job_engine::closure_job::ClosureTask;
pub use job_engine::dispatcher::Dispatcher;
pub use job_engine::job::{Job, JobKind, Task};
pub use job_engine::rate_limiter::RateLimiter;
pub use job_engine::wait_group::WaitGroup;
pub use job_engine::worker::{Worker, WorkerHandle, WorkerState};
