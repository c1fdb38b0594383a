//! Concurrent execution of independent population jobs

use std::sync::Mutex;
use std::time::{Duration, Instant};

use biblion_core::{CancelToken, ProgressContext, WorkQueue, fmt_num};

use crate::error::PopulateError;
use crate::planner::{Planner, PopulationReport, PopulationRequest};

/// Outcome of every job, in submission order.
#[derive(Debug)]
pub struct RunSummary {
    pub results: Vec<Result<PopulationReport, PopulateError>>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.completed()
    }

    pub fn rows_written(&self) -> u64 {
        self.reports().map(|r| r.rows_written).sum()
    }

    pub fn skipped(&self) -> usize {
        self.reports().map(|r| r.skipped.len()).sum()
    }

    pub fn reports(&self) -> impl Iterator<Item = &PopulationReport> {
        self.results.iter().filter_map(|r| r.as_ref().ok())
    }

    pub fn log(&self) {
        log::info!(
            "{}/{} jobs completed, {} rows written, {} records skipped in {:.1}s",
            self.completed(),
            self.results.len(),
            fmt_num(self.rows_written()),
            self.skipped(),
            self.elapsed.as_secs_f64()
        );
        for r in self.results.iter().filter_map(|r| r.as_ref().err()) {
            log::error!("Job failed: {r}");
        }
    }
}

/// Run `requests` on up to `workers` rayon workers.
///
/// Each job owns its cursor and link cache; the store serialises their
/// batch transactions. Cancelling `cancel` stops every job at its next row.
pub fn run_jobs(
    planner: &Planner<'_>,
    requests: Vec<PopulationRequest>,
    workers: usize,
    progress: &ProgressContext,
    cancel: &CancelToken,
) -> RunSummary {
    let start = Instant::now();
    let queue = WorkQueue::new(requests);
    let results: Mutex<Vec<Option<Result<PopulationReport, PopulateError>>>> =
        Mutex::new((0..queue.total()).map(|_| None).collect());
    let workers = workers.clamp(1, queue.total().max(1));

    log::info!("Running {} jobs with {} workers", queue.total(), workers);
    rayon::scope(|s| {
        for _ in 0..workers {
            s.spawn(|_| {
                while let Some((idx, req)) = queue.claim() {
                    let pb = progress.job_line(&req.destination);
                    let result = planner.populate_with_progress(req, cancel, &pb);
                    if let Err(e) = &result {
                        pb.abandon_with_message(format!("failed: {e}"));
                    }
                    let mut results = results
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                    results[idx] = Some(result);
                }
            });
        }
    });

    let results = results
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .into_iter()
        .map(|r| r.unwrap_or(Err(PopulateError::Cancelled)))
        .collect();
    let summary = RunSummary {
        results,
        elapsed: start.elapsed(),
    };
    summary.log();
    summary
}
