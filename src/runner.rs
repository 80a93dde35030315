//! Running many jobs: sequential or on a rayon pool, with an optional retry.
//!
//! [`Validation::calc`] is synchronous and shares nothing mutable between jobs, so jobs
//! can be fanned out freely. The only retry the runner performs is
//! [`RetryPolicy::Once`]: a job failing with [`Error::TransientRead`] is resubmitted a
//! single time. Data and configuration errors are never retried.

use crate::dataset::Job;
use crate::error::{Error, Result};
use crate::io::ResultsSink;
use crate::results::JobResults;
use crate::validation::Validation;
use anyhow::anyhow;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    Sequential,
    /// `threads: None` uses one thread per logical CPU.
    Parallel { threads: Option<usize> },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    Never,
    /// Resubmit once after a transient read failure.
    #[default]
    Once,
}

/// What happened to one job.
#[derive(Debug)]
pub struct JobOutcome {
    pub job: Job,
    pub attempts: u32,
    pub result: Result<JobResults>,
}

/// Totals over a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub retried: usize,
    pub records: usize,
}

impl RunSummary {
    #[must_use]
    pub fn from_outcomes(outcomes: &[JobOutcome]) -> Self {
        let mut s = Self { jobs: outcomes.len(), ..Self::default() };
        for o in outcomes {
            if o.attempts > 1 {
                s.retried += 1;
            }
            match &o.result {
                Ok(r) => {
                    s.succeeded += 1;
                    s.records += r.len();
                }
                Err(_) => s.failed += 1,
            }
        }
        s
    }
}

/// Run one job under `policy`, returning the number of attempts made.
pub fn calc_with_retry(
    validation: &Validation,
    job: &Job,
    policy: RetryPolicy,
) -> (u32, Result<JobResults>) {
    match validation.calc(job) {
        Err(e) if e.is_transient() && policy == RetryPolicy::Once => {
            warn!(gpi = job.gpi, error = %e, "transient failure, retrying once");
            (2, validation.calc(job))
        }
        other => (1, other),
    }
}

pub struct JobRunner {
    pub mode: ExecMode,
    pub retry: RetryPolicy,
}

impl Default for JobRunner {
    fn default() -> Self {
        Self {
            mode: ExecMode::Parallel { threads: None },
            retry: RetryPolicy::Once,
        }
    }
}

impl JobRunner {
    #[must_use]
    pub fn sequential() -> Self {
        Self { mode: ExecMode::Sequential, ..Self::default() }
    }

    /// Run every job; outcomes come back in input order regardless of mode.
    ///
    /// # Errors
    /// Only if the worker pool cannot be created. Job failures are reported per outcome.
    pub fn run(&self, validation: &Validation, jobs: &[Job]) -> Result<Vec<JobOutcome>> {
        let one = |job: &Job| {
            let (attempts, result) = calc_with_retry(validation, job, self.retry);
            JobOutcome { job: *job, attempts, result }
        };
        let outcomes = match self.mode {
            ExecMode::Sequential => jobs.iter().map(one).collect(),
            ExecMode::Parallel { threads } => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads.unwrap_or_else(num_cpus::get).max(1))
                    .build()
                    .map_err(|e| Error::Other(anyhow!("build worker pool: {e}")))?;
                pool.install(|| jobs.par_iter().map(one).collect())
            }
        };
        Ok(outcomes)
    }

    /// Run every job and hand each successful result set to `sink`, in job order, then
    /// flush the sink.
    ///
    /// # Errors
    /// Worker pool creation or any sink write or flush failure.
    pub fn run_into<S: ResultsSink + ?Sized>(
        &self,
        validation: &Validation,
        jobs: &[Job],
        sink: &mut S,
    ) -> Result<RunSummary> {
        let outcomes = self.run(validation, jobs)?;
        for outcome in &outcomes {
            match &outcome.result {
                Ok(results) => {
                    sink.write(results)?;
                }
                Err(e) => warn!(gpi = outcome.job.gpi, error = %e, "job produced no results"),
            }
        }
        sink.flush()?;
        let summary = RunSummary::from_outcomes(&outcomes);
        info!(
            jobs = summary.jobs,
            succeeded = summary.succeeded,
            failed = summary.failed,
            retried = summary.retried,
            records = summary.records,
            "run finished"
        );
        Ok(summary)
    }
}
