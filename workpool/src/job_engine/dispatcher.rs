// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use async_channel::{Receiver, Sender};
use futures::channel::oneshot;
use futures::executor::block_on;
use futures::{pin_mut, select_biased, FutureExt};
use log::{debug, error, info, warn};

use crate::config::DispatcherConfig;
use crate::error::{DispatchError, Result};
use crate::job_engine::job::Job;
use crate::job_engine::rate_limiter::RateLimiter;
use crate::job_engine::wait_group::WaitGroup;
use crate::job_engine::worker::{Worker, WorkerHandle};

/// A job in the queue. For an unbuffered queue it carries the submitter's
/// acknowledgement, fired once a worker has the job.
struct Queued {
    job: Job,
    handed_over: Option<oneshot::Sender<()>>,
}

enum Lifecycle {
    Created,
    Running(Running),
    Stopped,
}

/// Everything that only exists between `start()` and `stop()`.
struct Running {
    queue: Sender<Queued>,
    queue_rx: Receiver<Queued>,
    registry: Receiver<WorkerHandle>,
    quit: Sender<()>,
    dispatch_thread: Option<JoinHandle<()>>,
    workers: Vec<Worker>,
    workers_alive: WaitGroup,
}

/// Books jobs that were accepted but never reached a worker.
#[derive(Clone)]
struct Ledger {
    completion: Option<WaitGroup>,
    abandoned: Arc<AtomicUsize>,
}

impl Ledger {
    fn abandon(&self, job: Job) {
        warn!(
            "abandoning job {} ({}): dispatcher is stopping",
            job.id(),
            job.desc()
        );
        self.abandoned.fetch_add(1, Ordering::Relaxed);
        if let Some(completion) = &self.completion {
            completion.done();
        }
    }
}

/// Runs jobs on a fixed set of worker threads, at most one job per worker.
///
/// Submitted jobs go into a bounded FIFO queue. A dedicated dispatch thread
/// takes them out in order, waits for a worker to advertise itself idle,
/// optionally waits for the rate limiter, and hands the job over. Completion
/// order across workers is not related to submission order.
pub struct Dispatcher {
    config: DispatcherConfig,
    running: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
    abandoned: Arc<AtomicUsize>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            running: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle::Created),
            abandoned: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Spawns the workers and the dispatch thread.
    ///
    /// A dispatcher can be started once. If a thread cannot be spawned, the
    /// threads spawned so far are stopped again and the dispatcher stays
    /// startable.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle();
        if !matches!(*lifecycle, Lifecycle::Created) {
            return Err(DispatchError::AlreadyStarted);
        }

        let config = &self.config;
        let (registry_tx, registry) = async_channel::bounded(config.max_workers);
        // async-channel has no zero-capacity channel; a single slot plus the
        // hand-over acknowledgement in `submit` gives the same rendezvous.
        let (queue, queue_rx) = async_channel::bounded(config.queue_capacity.max(1));
        let (quit, quit_rx) = async_channel::bounded(1);

        let workers_alive = WaitGroup::new();
        let mut workers = Vec::with_capacity(config.max_workers);
        for id in 0..config.max_workers {
            match Worker::spawn(
                id,
                registry_tx.clone(),
                config.completion.clone(),
                &workers_alive,
                &config.thread_name,
            ) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    error!("failed to spawn worker {id}: {e}");
                    drain_workers(&mut workers, &workers_alive);
                    return Err(e.into());
                }
            }
        }

        let dispatch_loop = DispatchLoop {
            queue: queue_rx.clone(),
            registry: registry.clone(),
            quit: quit_rx,
            limiter: config.rate_limit.map(RateLimiter::new),
            ledger: self.ledger(),
        };
        let dispatch_thread = match thread::Builder::new()
            .name(format!("{}-dispatch", config.thread_name))
            .spawn(move || block_on(dispatch_loop.run()))
        {
            Ok(thread) => thread,
            Err(e) => {
                error!("failed to spawn dispatch thread: {e}");
                drain_workers(&mut workers, &workers_alive);
                return Err(e.into());
            }
        };

        *lifecycle = Lifecycle::Running(Running {
            queue,
            queue_rx,
            registry,
            quit,
            dispatch_thread: Some(dispatch_thread),
            workers,
            workers_alive,
        });
        self.running.store(true, Ordering::Release);

        info!(
            "dispatcher started: {} workers, queue capacity {}, rate limit {:?}",
            config.max_workers, config.queue_capacity, config.rate_limit
        );
        Ok(())
    }

    /// Queues a job for execution.
    ///
    /// Blocks while the queue is full. With an unbuffered queue it blocks until
    /// a worker has taken the job. Fails with [`DispatchError::NotRunning`]
    /// outside the running window; a job refused that way is never executed.
    pub fn submit(&self, job: Job) -> Result<()> {
        let queue = {
            let lifecycle = self.lifecycle();
            match &*lifecycle {
                Lifecycle::Running(running) if self.running.load(Ordering::Acquire) => {
                    running.queue.clone()
                }
                _ => return Err(DispatchError::NotRunning),
            }
        };

        if let Some(completion) = &self.config.completion {
            completion.add(1);
        }

        let (ack, handed_over) = if self.config.is_unbuffered() {
            let (tx, rx) = oneshot::channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let queued = Queued {
            job,
            handed_over: ack,
        };
        if queue.send_blocking(queued).is_err() {
            // stop() closed the queue before the job got in
            if let Some(completion) = &self.config.completion {
                completion.done();
            }
            return Err(DispatchError::NotRunning);
        }

        match handed_over {
            // a cancelled acknowledgement means the job was abandoned, and already booked as such
            Some(rx) => block_on(rx).map_err(|_| DispatchError::NotRunning),
            None => Ok(()),
        }
    }

    /// Stops accepting jobs, ends the dispatch loop and drains the workers.
    ///
    /// Returns once every worker thread has exited. Jobs already running are
    /// finished; jobs that did not reach a worker yet are abandoned, logged and
    /// released from the completion count. Calling `stop` on a dispatcher that
    /// is not running does nothing.
    pub fn stop(&self) {
        let running = {
            let mut lifecycle = self.lifecycle();
            if !matches!(*lifecycle, Lifecycle::Running(_)) {
                return;
            }
            self.running.store(false, Ordering::Release);
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running(running) => running,
                _ => return,
            }
        };

        running.shutdown(&self.ledger());
    }

    /// Blocks until every submitted job has finished.
    ///
    /// Returns immediately if completion tracking is disabled.
    pub fn wait(&self) {
        match &self.config.completion {
            Some(completion) => completion.wait(),
            None => debug!("wait() called without completion tracking"),
        }
    }

    /// Jobs currently waiting in the queue. Advisory only.
    pub fn queue_size(&self) -> usize {
        match &*self.lifecycle() {
            Lifecycle::Running(running) => running.queue.len(),
            _ => 0,
        }
    }

    /// Workers currently advertised as idle. Advisory only.
    pub fn idle_workers(&self) -> usize {
        match &*self.lifecycle() {
            Lifecycle::Running(running) => running.registry.len(),
            _ => 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn max_workers(&self) -> usize {
        self.config.max_workers
    }

    /// Jobs that were accepted but dropped by `stop()` before reaching a worker.
    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    fn ledger(&self) -> Ledger {
        Ledger {
            completion: self.config.completion.clone(),
            abandoned: self.abandoned.clone(),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("abandoned", &self.abandoned())
            .finish()
    }
}

impl Running {
    fn shutdown(mut self, ledger: &Ledger) {
        debug!("signalling dispatch loop to exit");
        self.quit.close();
        if let Some(thread) = self.dispatch_thread.take() {
            if thread.join().is_err() {
                error!("dispatch thread terminated abnormally");
            }
        }

        // nothing can enter a closed queue, so the drain below sees every leftover
        self.queue.close();
        let mut leftover = 0;
        while let Ok(queued) = self.queue_rx.try_recv() {
            leftover += 1;
            ledger.abandon(queued.job);
        }
        if leftover > 0 {
            warn!("{leftover} queued jobs were abandoned");
        }

        drain_workers(&mut self.workers, &self.workers_alive);
        self.registry.close();
        info!("dispatcher stopped, {} workers drained", self.workers.len());
    }
}

/// Stops every worker once it is idle and waits for all of them to exit.
fn drain_workers(workers: &mut [Worker], alive: &WaitGroup) {
    for worker in workers.iter() {
        worker.request_stop();
    }
    alive.wait();
    for worker in workers.iter_mut() {
        worker.join();
    }
}

/// The single reader of the queue and the registry.
struct DispatchLoop {
    queue: Receiver<Queued>,
    registry: Receiver<WorkerHandle>,
    quit: Receiver<()>,
    limiter: Option<RateLimiter>,
    ledger: Ledger,
}

impl DispatchLoop {
    async fn run(mut self) {
        debug!("dispatch loop started");
        while let Some(queued) = self.next_job().await {
            if !self.dispatch(queued).await {
                break;
            }
        }
        info!("dispatch loop exited");
    }

    /// Waits for the next queued job. `None` means shutdown.
    async fn next_job(&self) -> Option<Queued> {
        let quit = self.quit.recv().fuse();
        let next = self.queue.recv().fuse();
        pin_mut!(quit, next);

        select_biased! {
            _ = quit => None,
            queued = next => queued.ok(),
        }
    }

    /// Hands one job to an idle worker. Returns `false` if shutdown
    /// interrupted the wait, in which case the job has been abandoned.
    async fn dispatch(&mut self, queued: Queued) -> bool {
        let Queued {
            mut job,
            handed_over,
        } = queued;
        let mut paced = false;

        loop {
            let Some(worker) = self.idle_worker().await else {
                self.ledger.abandon(job);
                return false;
            };

            if !paced {
                if let Some(limiter) = self.limiter.as_mut() {
                    let tick = limiter.tick().fuse();
                    let quit = self.quit.recv().fuse();
                    pin_mut!(tick, quit);

                    let interrupted = select_biased! {
                        _ = quit => true,
                        _ = tick => false,
                    };
                    if interrupted {
                        self.ledger.abandon(job);
                        return false;
                    }
                }
                paced = true;
            }

            match worker.hand_over(job).await {
                Ok(()) => {
                    if let Some(ack) = handed_over {
                        // the submitter may have given up waiting; nothing to do then
                        let _ = ack.send(());
                    }
                    return true;
                }
                Err(returned) => {
                    warn!(
                        "worker {} is gone, dispatching job {} to another worker",
                        worker.id(),
                        returned.id()
                    );
                    job = returned;
                }
            }
        }
    }

    /// Waits for a worker to advertise itself. `None` means shutdown.
    async fn idle_worker(&self) -> Option<WorkerHandle> {
        let quit = self.quit.recv().fuse();
        let next = self.registry.recv().fuse();
        pin_mut!(quit, next);

        select_biased! {
            _ = quit => None,
            handle = next => handle.ok(),
        }
    }
}
