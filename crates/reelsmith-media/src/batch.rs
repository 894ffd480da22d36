// crates/reelsmith-media/src/batch.rs
//
// BatchRunner: executes many jobs concurrently on a bounded worker pool with
// per-job failure isolation.
//
// Concurrency model: one scoped thread per accepted job, each gated by a
// Mutex+Condvar semaphore so at most `worker_limit` pipelines run at once.
// A job blocks its worker for its whole pipeline (validate → assemble →
// export); there is no intra-job parallelism and no cancellation.
//
// Isolation: every error — and every panic — is caught at the job boundary
// and converted into a Failed JobResult. One job can never abort its
// siblings or the batch.
//
// Ordering: progress events and the returned sequence follow completion
// order, not submission order. Each result carries the task_id of its
// originating job (its index in the submitted sequence), so callers can
// reconstruct input order.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

use crossbeam_channel::{unbounded, Sender};

use reelsmith_core::sanitize::sanitize_filename;
use reelsmith_core::{Canvas, Job, JobResult, PipelineError};

use crate::assemble::assemble_timeline;
use crate::export::{export_timeline, extension_for_codec, ExportSettings};

/// Jobs beyond this cap are dropped, not failed — the result sequence is
/// simply shorter than the input. Callers matching results to jobs by
/// position must use task_id instead.
pub const MAX_BATCH_SIZE: usize = 50;

/// Default bound on concurrently running jobs.
pub const DEFAULT_WORKERS: usize = 2;

/// Emitted after each job completes: how many are done, out of how many
/// accepted, plus that job's result.
#[derive(Clone, Debug)]
pub struct BatchProgress {
    pub completed: usize,
    pub total:     usize,
    pub result:    JobResult,
}

// ── BatchRunner ───────────────────────────────────────────────────────────────

pub struct BatchRunner {
    canvas:       Canvas,
    worker_limit: usize,
    output_dir:   PathBuf,
}

impl BatchRunner {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            canvas:       Canvas::default(),
            worker_limit: DEFAULT_WORKERS,
            output_dir:   output_dir.into(),
        }
    }

    pub fn with_workers(mut self, worker_limit: usize) -> Self {
        self.worker_limit = worker_limit.max(1);
        self
    }

    pub fn with_canvas(mut self, canvas: Canvas) -> Self {
        self.canvas = canvas;
        self
    }

    /// Execute `jobs` through the full pipeline. Returns one JobResult per
    /// accepted job once all workers are idle.
    ///
    /// Duplicate resolved output paths are rejected at submission: the first
    /// job keeps the path, later duplicates fail validation before running —
    /// siblings never clobber each other's artifacts.
    pub fn run(&self, jobs: Vec<Job>, progress: Option<Sender<BatchProgress>>) -> Vec<JobResult> {
        let duplicates = duplicate_outputs(&jobs, &self.output_dir);
        self.run_with(jobs, progress, |job, task_id| {
            if duplicates.contains(&task_id) {
                return Err(PipelineError::Validation(format!(
                    "output path '{}' is already claimed by an earlier job",
                    resolve_output(job, &self.output_dir).display()
                )));
            }
            execute_job(job, &self.canvas, &self.output_dir)
        })
    }

    /// Batch semantics with the job executor injected — the seam the real
    /// pipeline plugs into, and what the tests drive without touching media.
    pub fn run_with<F>(
        &self,
        mut jobs: Vec<Job>,
        progress: Option<Sender<BatchProgress>>,
        execute:  F,
    ) -> Vec<JobResult>
    where
        F: Fn(&Job, usize) -> reelsmith_core::Result<PathBuf> + Send + Sync,
    {
        if jobs.len() > MAX_BATCH_SIZE {
            log::warn!(
                "batch of {} exceeds the {MAX_BATCH_SIZE}-job cap — dropping the tail",
                jobs.len()
            );
            jobs.truncate(MAX_BATCH_SIZE);
        }

        let total = jobs.len();
        let completed = AtomicUsize::new(0);
        let semaphore = (Mutex::new(0usize), Condvar::new());
        let (tx, rx) = unbounded::<JobResult>();

        std::thread::scope(|s| {
            for (task_id, job) in jobs.iter().enumerate() {
                let tx = &tx;
                let execute = &execute;
                let progress = &progress;
                let completed = &completed;
                let semaphore = &semaphore;

                s.spawn(move || {
                    let _slot = acquire(semaphore, self.worker_limit);

                    let result = match catch_unwind(AssertUnwindSafe(|| execute(job, task_id))) {
                        Ok(Ok(path)) => JobResult::success(task_id, path),
                        Ok(Err(err)) => JobResult::failed(task_id, err.to_string()),
                        Err(panic)   => JobResult::failed(task_id, panic_message(&panic)),
                    };

                    if result.is_success() {
                        log::info!("task {task_id} finished: {:?}", result.output_path);
                    } else {
                        log::error!("task {task_id} failed: {:?}", result.error);
                    }

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(sink) = progress {
                        let _ = sink.send(BatchProgress { completed: done, total, result: result.clone() });
                    }
                    let _ = tx.send(result);
                });
            }
        });

        drop(tx);
        rx.iter().collect()
    }
}

// ── The per-job pipeline ──────────────────────────────────────────────────────

fn execute_job(job: &Job, canvas: &Canvas, output_dir: &PathBuf) -> reelsmith_core::Result<PathBuf> {
    if sanitize_filename(&job.output_name).is_empty() {
        return Err(PipelineError::Validation("output name is empty after sanitization".into()));
    }
    let timeline = assemble_timeline(job, *canvas)?;
    let output = resolve_output(job, output_dir);
    export_timeline(timeline, &output, &ExportSettings::from_job(job), None)?;
    Ok(output)
}

/// The sanitized output path a job will write.
fn resolve_output(job: &Job, output_dir: &PathBuf) -> PathBuf {
    let name = sanitize_filename(&job.output_name);
    output_dir.join(format!("{name}{}", extension_for_codec(&job.codec)))
}

/// Task ids whose resolved output path was already claimed by an earlier job.
fn duplicate_outputs(jobs: &[Job], output_dir: &PathBuf) -> std::collections::HashSet<usize> {
    let mut first_claim: HashMap<PathBuf, usize> = HashMap::new();
    let mut dups = std::collections::HashSet::new();
    for (task_id, job) in jobs.iter().enumerate() {
        let path = resolve_output(job, output_dir);
        if first_claim.insert(path, task_id).is_some() {
            dups.insert(task_id);
        }
    }
    dups
}

// ── Semaphore ─────────────────────────────────────────────────────────────────

/// RAII slot in the bounded pool: blocks until fewer than `limit` jobs are
/// running, releases and wakes the next waiter on drop.
struct Slot<'a> {
    semaphore: &'a (Mutex<usize>, Condvar),
}

fn acquire(semaphore: &(Mutex<usize>, Condvar), limit: usize) -> Slot<'_> {
    let (lock, cvar) = semaphore;
    let mut running = lock.lock().unwrap();
    while *running >= limit {
        running = cvar.wait(running).unwrap();
    }
    *running += 1;
    Slot { semaphore }
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        let (lock, cvar) = self.semaphore;
        *lock.lock().unwrap() -= 1;
        cvar.notify_one();
    }
}

/// Extract something readable from a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("job panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("job panicked: {s}")
    } else {
        "job panicked".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelsmith_core::{JobStatus, SourceKind};

    fn image_job(name: &str, files: &[&str]) -> Job {
        Job::new(SourceKind::Images, files.iter().map(PathBuf::from).collect(), name)
    }

    /// Stub pipeline: validate like the real one, then pretend to export.
    fn stub(job: &Job, task_id: usize) -> reelsmith_core::Result<PathBuf> {
        job.validate()?;
        Ok(PathBuf::from(format!("out/video_{task_id}.mp4")))
    }

    fn runner() -> BatchRunner {
        BatchRunner::new("out")
    }

    #[test]
    fn malformed_job_fails_without_touching_siblings() {
        for worker_limit in [1, 5] {
            let jobs: Vec<Job> = (0..5)
                .map(|i| {
                    if i == 2 {
                        image_job("bad", &[]) // empty file list
                    } else {
                        image_job(&format!("ok_{i}"), &["a.png"])
                    }
                })
                .collect();

            let results = runner().with_workers(worker_limit).run_with(jobs, None, stub);
            assert_eq!(results.len(), 5);
            for r in &results {
                if r.task_id == 2 {
                    assert_eq!(r.status, JobStatus::Failed);
                    assert!(r.error.as_deref().unwrap().contains("no source files"));
                } else {
                    assert!(r.is_success(), "task {} should pass", r.task_id);
                }
            }
        }
    }

    #[test]
    fn task_ids_cover_input_indices_exactly_once() {
        let jobs: Vec<Job> = (0..12).map(|i| image_job(&format!("v{i}"), &["a.png"])).collect();
        let results = runner().with_workers(4).run_with(jobs, None, stub);

        let mut ids: Vec<usize> = results.iter().map(|r| r.task_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn oversized_batch_is_truncated_to_the_cap() {
        let jobs: Vec<Job> = (0..60).map(|i| image_job(&format!("v{i}"), &["a.png"])).collect();
        let results = runner().with_workers(8).run_with(jobs, None, stub);

        // Observable only through the count: 50 results covering ids 0..50.
        assert_eq!(results.len(), MAX_BATCH_SIZE);
        let mut ids: Vec<usize> = results.iter().map(|r| r.task_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..MAX_BATCH_SIZE).collect::<Vec<_>>());
    }

    #[test]
    fn panicking_job_reports_failed_and_spares_the_rest() {
        let jobs: Vec<Job> = (0..4).map(|i| image_job(&format!("v{i}"), &["a.png"])).collect();
        let results = runner().with_workers(2).run_with(jobs, None, |job, task_id| {
            if task_id == 1 {
                panic!("simulated decoder crash");
            }
            stub(job, task_id)
        });

        assert_eq!(results.len(), 4);
        let failed = results.iter().find(|r| r.task_id == 1).unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.error.as_deref().unwrap().contains("simulated decoder crash"));
        assert_eq!(results.iter().filter(|r| r.is_success()).count(), 3);
    }

    #[test]
    fn progress_events_count_up_and_carry_results() {
        let (tx, rx) = unbounded();
        let jobs: Vec<Job> = (0..6).map(|i| image_job(&format!("v{i}"), &["a.png"])).collect();
        let results = runner().with_workers(3).run_with(jobs, Some(tx), stub);
        assert_eq!(results.len(), 6);

        let events: Vec<BatchProgress> = rx.try_iter().collect();
        assert_eq!(events.len(), 6);
        let mut counts: Vec<usize> = events.iter().map(|e| e.completed).collect();
        counts.sort_unstable();
        assert_eq!(counts, (1..=6).collect::<Vec<_>>());
        for e in &events {
            assert_eq!(e.total, 6);
            assert!(e.result.is_success());
        }
    }

    #[test]
    fn single_worker_preserves_submission_order() {
        let jobs: Vec<Job> = (0..5).map(|i| image_job(&format!("v{i}"), &["a.png"])).collect();
        let results = runner().with_workers(1).run_with(jobs, None, stub);
        let ids: Vec<usize> = results.iter().map(|r| r.task_id).collect();
        assert_eq!(ids, (0..5).collect::<Vec<_>>());
    }

    #[test]
    fn duplicate_output_names_flag_later_jobs() {
        let jobs = vec![
            image_job("same", &["a.png"]),
            image_job("other", &["a.png"]),
            image_job("same", &["a.png"]),
        ];
        let dups = duplicate_outputs(&jobs, &PathBuf::from("out"));
        assert_eq!(dups.len(), 1);
        assert!(dups.contains(&2));
    }

    #[test]
    fn sanitized_names_share_a_resolved_path() {
        // "a/b" and "a_b" sanitize to the same file name.
        let jobs = vec![image_job("a/b", &["a.png"]), image_job("a_b", &["a.png"])];
        let dups = duplicate_outputs(&jobs, &PathBuf::from("out"));
        assert!(dups.contains(&1));
    }
}
