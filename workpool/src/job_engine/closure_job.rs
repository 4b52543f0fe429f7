// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use crate::job_engine::job::Task;

/// A task whose body is a closure.
pub struct ClosureTask {
    name: String,
    body: Box<dyn FnOnce() + Send + 'static>,
}

impl ClosureTask {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(f),
        }
    }
}

impl Task for ClosureTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(self: Box<Self>) {
        (self.body)()
    }
}

/// Example usage
#[test]
pub fn example() {
    use crate::config::DispatcherConfig;
    use crate::ids::UuidIds;
    use crate::job_engine::dispatcher::Dispatcher;
    use crate::job_engine::job::Job;

    let dispatcher = Dispatcher::new(DispatcherConfig::new(2, 4).with_completion_tracking())
        .expect("valid config");
    dispatcher.start().expect("dispatcher starts");

    dispatcher
        .submit(Job::from_fn(&UuidIds, "Host maintenance", || {
            println!("Running host maintenance");
        }))
        .expect("dispatcher accepts jobs while running");

    dispatcher.wait();
    dispatcher.stop();
}
