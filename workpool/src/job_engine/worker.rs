// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use async_channel::{Receiver, SendError, Sender};
use log::{debug, error};

use crate::job_engine::job::Job;
use crate::job_engine::wait_group::WaitGroup;

/// What arrives in a worker's private mailbox.
pub(crate) enum Envelope {
    Run(Job),
    Stop,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum WorkerState {
    Idle = 0,
    Busy = 1,
    Stopped = 2,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Busy,
            _ => WorkerState::Stopped,
        }
    }
}

/// The token an idle worker puts into the registry.
///
/// Whoever takes it out of the registry may hand exactly one job to the worker.
#[derive(Clone)]
pub struct WorkerHandle {
    id: usize,
    mailbox: Sender<Envelope>,
}

impl WorkerHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Gives the job to the worker. Hands the job back if the worker is gone.
    pub(crate) async fn hand_over(&self, job: Job) -> Result<(), Job> {
        match self.mailbox.send(Envelope::Run(job)).await {
            Ok(()) => Ok(()),
            Err(SendError(Envelope::Run(job))) => Err(job),
            // only `Run` is ever sent through a handle
            Err(SendError(Envelope::Stop)) => unreachable!("hand_over sent a stop request"),
        }
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle").field("id", &self.id).finish()
    }
}

/// A long-lived thread that runs one job at a time.
///
/// Whenever it is idle the worker advertises a [`WorkerHandle`] in the shared
/// registry, then blocks on its mailbox until a job or a stop request arrives.
#[derive(Debug)]
pub struct Worker {
    id: usize,
    mailbox: Sender<Envelope>,
    state: Arc<AtomicU8>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns the worker thread.
    ///
    /// `alive` is incremented here and decremented when the thread exits, so a
    /// caller can wait for a whole set of workers to be gone.
    pub fn spawn(
        id: usize,
        registry: Sender<WorkerHandle>,
        completion: Option<WaitGroup>,
        alive: &WaitGroup,
        thread_name: &str,
    ) -> io::Result<Self> {
        // one slot: at most one job, or one stop request, is ever in flight
        let (mailbox, inbox) = async_channel::bounded(1);
        let state = Arc::new(AtomicU8::new(WorkerState::Idle as u8));

        alive.add(1);
        let exit_guard = alive.done_on_drop();
        let worker_loop = WorkerLoop {
            handle: WorkerHandle {
                id,
                mailbox: mailbox.clone(),
            },
            inbox,
            registry,
            completion,
            state: state.clone(),
        };

        let thread = thread::Builder::new()
            .name(format!("{thread_name}-worker-{id}"))
            .spawn(move || {
                let _exit = exit_guard;
                worker_loop.run();
            })?;

        Ok(Self {
            id,
            mailbox,
            state,
            thread: Some(thread),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_idle(&self) -> bool {
        self.state() == WorkerState::Idle
    }

    /// Asks the worker to stop without blocking.
    ///
    /// Succeeds only if the worker is idle and nothing is waiting in its
    /// mailbox. A busy worker is left alone and `false` is returned.
    pub fn try_stop(&self) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.mailbox.try_send(Envelope::Stop).is_ok()
    }

    /// Queues a stop request behind whatever job was already handed over.
    ///
    /// Blocks only while the mailbox holds an undelivered job, which the worker
    /// picks up next.
    pub(crate) fn request_stop(&self) {
        if self.mailbox.send_blocking(Envelope::Stop).is_err() {
            debug!("worker {} already exited", self.id);
        }
    }

    /// Waits for the worker thread to exit.
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("worker {} thread terminated abnormally", self.id);
            }
        }
    }
}

struct WorkerLoop {
    handle: WorkerHandle,
    inbox: Receiver<Envelope>,
    registry: Sender<WorkerHandle>,
    completion: Option<WaitGroup>,
    state: Arc<AtomicU8>,
}

impl WorkerLoop {
    fn run(self) {
        let id = self.handle.id;
        debug!("worker {id} started");

        loop {
            if self.registry.send_blocking(self.handle.clone()).is_err() {
                debug!("worker {id}: registry closed");
                break;
            }

            match self.inbox.recv_blocking() {
                Ok(Envelope::Run(job)) => self.execute(job),
                Ok(Envelope::Stop) | Err(_) => break,
            }
        }

        self.set_state(WorkerState::Stopped);
        debug!("worker {id} stopped");
    }

    fn execute(&self, job: Job) {
        self.set_state(WorkerState::Busy);

        let id = job.id().to_string();
        debug!("worker {}: executing job {} ({})", self.handle.id, id, job.desc());
        let started = Instant::now();

        match panic::catch_unwind(AssertUnwindSafe(|| job.execute())) {
            Ok(()) => debug!("job {} finished after {:?}", id, started.elapsed()),
            Err(payload) => error!("job {} panicked: {}", id, panic_message(payload.as_ref())),
        }

        self.set_state(WorkerState::Idle);
        if let Some(completion) = &self.completion {
            completion.done();
        }
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
