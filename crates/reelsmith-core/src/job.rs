// crates/reelsmith-core/src/job.rs
//
// Job: one complete video-generation request, built by the CLI (or any other
// front end) at submission time and never mutated afterwards. Workers only
// ever see an owned, immutable Job — there is no live editable state behind
// it to race on.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::geometry::FillMode;
use crate::media_kinds::{classify, MediaKind};

// ── Job ───────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Images,
    Videos,
}

/// One video-generation request.
///
/// `fill_mode` applies to video jobs only (image jobs always letterbox);
/// `duration_per_item` and `use_transitions` apply to image jobs only.
/// The unused fields are carried but ignored, matching the submission format.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub source_kind:       SourceKind,
    pub source_files:      Vec<PathBuf>,
    pub audio_file:        Option<PathBuf>,
    /// Pre-sanitization output name; the batch runner sanitizes and resolves it.
    pub output_name:       String,
    pub fill_mode:         FillMode,
    /// Seconds each still image is held for.
    pub duration_per_item: f64,
    pub use_transitions:   bool,
    pub codec:             String,
    pub bitrate:           String,
    pub fps:               u32,
}

impl Job {
    /// A job with the documented submission defaults: fit, 3 s per image,
    /// transitions on, libx264 @ 4000k, 30 fps.
    pub fn new(source_kind: SourceKind, source_files: Vec<PathBuf>, output_name: impl Into<String>) -> Self {
        Self {
            source_kind,
            source_files,
            audio_file:        None,
            output_name:       output_name.into(),
            fill_mode:         FillMode::Fit,
            duration_per_item: 3.0,
            use_transitions:   true,
            codec:             "libx264".into(),
            bitrate:           "4000k".into(),
            fps:               30,
        }
    }

    /// The media kind every source file must classify as.
    pub fn required_kind(&self) -> MediaKind {
        match self.source_kind {
            SourceKind::Images => MediaKind::Image,
            SourceKind::Videos => MediaKind::Video,
        }
    }

    /// Check the record before any media is touched. An empty file list and
    /// kind-inconsistent paths are rejected here; files that classify
    /// correctly but cannot actually be decoded fail later, at decode time.
    pub fn validate(&self) -> Result<()> {
        if self.source_files.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        if self.fps == 0 {
            return Err(PipelineError::Validation("fps must be positive".into()));
        }
        if self.source_kind == SourceKind::Images && self.duration_per_item <= 0.0 {
            return Err(PipelineError::Validation(format!(
                "duration per image must be positive (got {})",
                self.duration_per_item
            )));
        }
        let required = self.required_kind();
        for path in &self.source_files {
            let kind = classify(path);
            if kind != required {
                return Err(PipelineError::Validation(format!(
                    "'{}' is {kind:?}, but this job expects {required:?} sources",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Failed,
}

/// Outcome of one job. `output_path` is present iff the job succeeded;
/// `error` iff it failed. `task_id` is the job's index in the submitted
/// sequence, so callers can reconstruct input order from completion-ordered
/// results.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobResult {
    pub task_id:     usize,
    pub status:      JobStatus,
    pub output_path: Option<PathBuf>,
    pub error:       Option<String>,
}

impl JobResult {
    pub fn success(task_id: usize, output_path: PathBuf) -> Self {
        Self { task_id, status: JobStatus::Success, output_path: Some(output_path), error: None }
    }

    pub fn failed(task_id: usize, error: impl Into<String>) -> Self {
        Self { task_id, status: JobStatus::Failed, output_path: None, error: Some(error.into()) }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_job(files: &[&str]) -> Job {
        Job::new(SourceKind::Images, files.iter().map(PathBuf::from).collect(), "out")
    }

    #[test]
    fn valid_image_job_passes() {
        assert!(image_job(&["a.png", "b.jpg"]).validate().is_ok());
    }

    #[test]
    fn empty_file_list_is_empty_input() {
        let err = image_job(&[]).validate().unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn wrong_kind_path_fails_validation_naming_the_file() {
        let err = image_job(&["a.png", "clip.mp4"]).validate().unwrap_err();
        let PipelineError::Validation(msg) = err else { panic!("wrong variant") };
        assert!(msg.contains("clip.mp4"));
    }

    #[test]
    fn video_job_rejects_images() {
        let job = Job::new(SourceKind::Videos, vec!["photo.jpeg".into()], "out");
        assert!(matches!(job.validate(), Err(PipelineError::Validation(_))));
    }

    #[test]
    fn nonpositive_duration_rejected_for_image_jobs() {
        let mut job = image_job(&["a.png"]);
        job.duration_per_item = 0.0;
        assert!(matches!(job.validate(), Err(PipelineError::Validation(_))));
    }

    #[test]
    fn result_constructors_keep_fields_consistent() {
        let ok = JobResult::success(3, "out/v.mp4".into());
        assert!(ok.is_success() && ok.output_path.is_some() && ok.error.is_none());

        let bad = JobResult::failed(4, "boom");
        assert!(!bad.is_success() && bad.output_path.is_none());
        assert_eq!(bad.error.as_deref(), Some("boom"));
    }

    #[test]
    fn job_serde_round_trip() {
        let mut job = image_job(&["a.png"]);
        job.audio_file = Some("track.mp3".into());
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back.source_files, job.source_files);
        assert_eq!(back.audio_file, job.audio_file);
        assert_eq!(back.fill_mode, job.fill_mode);
    }
}
