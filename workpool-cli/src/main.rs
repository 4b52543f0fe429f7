// SPDX-License-Identifier: MIT
// workpool: runs a synthetic load through the bounded worker-pool dispatcher
//
// - Spawns a number of submitter threads that push jobs into the dispatcher.
// - Reports throughput, the concurrency high-water mark and abandoned jobs.
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use log::info;
use serde::Serialize;
use workpool::{Dispatcher, DispatcherConfig, IdSource, Job, SequentialIds, UuidIds};

pub mod jobs;
pub mod occupancy;

use crate::jobs::ping_message::{ping_job, Ping};
use crate::jobs::sleep_job::SleepJob;
use crate::occupancy::Occupancy;

/// Which job variant the load consists of.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Default)]
#[clap(rename_all = "kebab-case")]
enum LoadKind {
    #[default]
    /// Tasks that run on their own data
    Task,
    /// Payloads delivered to a recipient
    Message,
}

/// How job identifiers are generated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Default)]
enum IdScheme {
    #[default]
    /// job-1, job-2, ...
    Sequential,
    /// Random v4 UUIDs
    Uuid,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Number of worker threads
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Jobs that may wait in the queue (0 = synchronous hand-off)
    #[arg(long, default_value_t = 16)]
    queue_capacity: usize,

    /// Minimum gap between two dispatches, in milliseconds
    #[arg(long, value_name = "MS")]
    rate_limit_ms: Option<u64>,

    /// Total number of jobs to submit
    #[arg(long, default_value_t = 100)]
    jobs: usize,

    /// Number of threads submitting jobs concurrently
    #[arg(long, default_value_t = 2)]
    submitters: usize,

    /// How long each job keeps its worker busy, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 10)]
    job_ms: u64,

    #[arg(long, value_enum, default_value_t)]
    kind: LoadKind,

    #[arg(long, value_enum, default_value_t)]
    ids: IdScheme,

    /// Stop right after submitting instead of waiting for all jobs
    #[arg(long)]
    no_wait: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn dispatcher_config(&self) -> DispatcherConfig {
        let mut config = DispatcherConfig::new(self.workers, self.queue_capacity)
            .with_completion_tracking();
        if let Some(ms) = self.rate_limit_ms {
            config = config.with_rate_limit(Duration::from_millis(ms));
        }
        config
    }

    fn id_source(&self) -> Arc<dyn IdSource> {
        match self.ids {
            IdScheme::Sequential => Arc::new(SequentialIds::new("job")),
            IdScheme::Uuid => Arc::new(UuidIds),
        }
    }
}

#[derive(Debug, Serialize)]
struct RunSummary {
    workers: usize,
    queue_capacity: usize,
    rate_limit_ms: Option<u64>,
    submitted: usize,
    executed: usize,
    abandoned: usize,
    peak_concurrency: usize,
    elapsed_ms: u128,
}

fn validate_args(args: &Args) -> Result<(), String> {
    if args.workers == 0 {
        return Err("--workers must be at least 1".into());
    }
    if args.submitters == 0 {
        return Err("--submitters must be at least 1".into());
    }
    if args.rate_limit_ms == Some(0) {
        return Err("--rate-limit-ms must be greater than 0".into());
    }
    Ok(())
}

/// Splits `total` into `parts` shares that differ by at most one.
fn shares(total: usize, parts: usize) -> Vec<usize> {
    (0..parts)
        .map(|i| total / parts + usize::from(i < total % parts))
        .collect()
}

fn build_job(
    args: &Args,
    ids: &dyn IdSource,
    seq: usize,
    occupancy: &Arc<Occupancy>,
) -> Job {
    let hold = Duration::from_millis(args.job_ms);
    match args.kind {
        LoadKind::Task => Job::task(ids, SleepJob::new(seq, hold, occupancy.clone())),
        LoadKind::Message => ping_job(ids, Ping { seq, hold }, occupancy.clone()),
    }
}

fn run(args: Args) -> anyhow::Result<RunSummary> {
    let dispatcher = Arc::new(
        Dispatcher::new(args.dispatcher_config()).context("invalid dispatcher configuration")?,
    );
    dispatcher.start().context("failed to start the dispatcher")?;

    let args = Arc::new(args);
    let ids = args.id_source();
    let occupancy = Arc::new(Occupancy::default());
    let started = Instant::now();

    let mut submitters = Vec::with_capacity(args.submitters);
    let mut offset = 0;
    for (n, share) in shares(args.jobs, args.submitters).into_iter().enumerate() {
        let (args, ids, occupancy, dispatcher) = (
            args.clone(),
            ids.clone(),
            occupancy.clone(),
            dispatcher.clone(),
        );
        let first = offset;
        offset += share;
        let handle = thread::Builder::new()
            .name(format!("submitter-{n}"))
            .spawn(move || -> anyhow::Result<usize> {
                for seq in first..first + share {
                    let job = build_job(&args, ids.as_ref(), seq, &occupancy);
                    dispatcher
                        .submit(job)
                        .with_context(|| format!("submitting job #{seq}"))?;
                }
                Ok(share)
            })
            .context("failed to spawn submitter thread")?;
        submitters.push(handle);
    }

    let mut submitted = 0;
    for handle in submitters {
        submitted += handle
            .join()
            .map_err(|_| anyhow!("submitter thread panicked"))??;
    }
    info!("{submitted} jobs submitted, {} still queued", dispatcher.queue_size());

    if !args.no_wait {
        dispatcher.wait();
    }
    dispatcher.stop();

    Ok(RunSummary {
        workers: args.workers,
        queue_capacity: args.queue_capacity,
        rate_limit_ms: args.rate_limit_ms,
        submitted,
        executed: occupancy.executed(),
        abandoned: dispatcher.abandoned(),
        peak_concurrency: occupancy.peak(),
        elapsed_ms: started.elapsed().as_millis(),
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {e}");
        std::process::exit(2);
    }

    let json = args.json;
    let summary = run(args)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{} submitted, {} executed, {} abandoned, peak concurrency {}/{} in {} ms",
            summary.submitted,
            summary.executed,
            summary.abandoned,
            summary.peak_concurrency,
            summary.workers,
            summary.elapsed_ms
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["workpool"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn shares_cover_total() {
        assert_eq!(shares(10, 3), vec![4, 3, 3]);
        assert_eq!(shares(2, 4), vec![1, 1, 0, 0]);
        assert_eq!(shares(9, 3).iter().sum::<usize>(), 9);
    }

    #[test]
    fn validate_rejects_zero_submitters() {
        assert!(validate_args(&args(&["--submitters", "0"])).is_err());
        assert!(validate_args(&args(&["--rate-limit-ms", "0"])).is_err());
        assert!(validate_args(&args(&[])).is_ok());
    }

    #[test]
    fn kind_is_kebab_case() {
        assert_eq!(args(&["--kind", "message"]).kind, LoadKind::Message);
        assert_eq!(args(&["--ids", "uuid"]).ids, IdScheme::Uuid);
    }

    #[test]
    fn run_executes_every_job_within_the_worker_bound() {
        let summary = run(args(&[
            "--workers", "3", "--jobs", "30", "--job-ms", "2", "--submitters", "3",
        ]))
        .unwrap();
        assert_eq!(summary.submitted, 30);
        assert_eq!(summary.executed, 30);
        assert_eq!(summary.abandoned, 0);
        assert!(summary.peak_concurrency <= 3);
    }

    #[test]
    fn summary_serializes_to_json() {
        let summary = run(args(&["--jobs", "4", "--job-ms", "0", "--kind", "message"])).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["executed"], 4);
        assert!(json["rate_limit_ms"].is_null());
    }
}
