// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::fmt;

use crate::ids::IdSource;
use crate::job_engine::closure_job::ClosureTask;

/// Distinguishes how a job's work was described when it was built.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum JobKind {
    /// A payload delivered to a recipient.
    Message,
    /// An operation that runs on its own data.
    Task,
}

/// A unit of work that knows how to run itself.
pub trait Task: Send + 'static {
    /// Free-form name, used for logging or debugging
    fn name(&self) -> &str;

    /// Runs the task to completion on the calling thread.
    fn run(self: Box<Self>);
}

enum Body {
    Message(Box<dyn FnOnce() + Send + 'static>),
    Task(Box<dyn Task>),
}

/// An immutable unit of work handed to the dispatcher.
///
/// The id and the work are fixed at construction. Executing a job consumes it,
/// so a job runs at most once and whatever executes it owns it exclusively.
pub struct Job {
    id: String,
    desc: String,
    body: Body,
}

impl Job {
    /// Builds a job that delivers `payload` to `recipient`.
    pub fn message<P, F>(ids: &dyn IdSource, payload: P, recipient: F) -> Self
    where
        P: Send + 'static,
        F: FnOnce(P) + Send + 'static,
    {
        Self {
            id: ids.next_id(),
            desc: format!("message<{}>", std::any::type_name::<P>()),
            body: Body::Message(Box::new(move || recipient(payload))),
        }
    }

    /// Builds a job that runs `task`.
    pub fn task<T: Task>(ids: &dyn IdSource, task: T) -> Self {
        Self {
            id: ids.next_id(),
            desc: task.name().to_string(),
            body: Body::Task(Box::new(task)),
        }
    }

    /// Builds a task job from a closure.
    pub fn from_fn<F>(ids: &dyn IdSource, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::task(ids, ClosureTask::new(name, f))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> JobKind {
        match self.body {
            Body::Message(_) => JobKind::Message,
            Body::Task(_) => JobKind::Task,
        }
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Runs the job on the calling thread and returns once it is done.
    ///
    /// Whatever the work does on failure is its own business; the caller only
    /// learns that control came back.
    pub fn execute(self) {
        match self.body {
            Body::Message(deliver) => deliver(),
            Body::Task(task) => task.run(),
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("desc", &self.desc)
            .finish()
    }
}
