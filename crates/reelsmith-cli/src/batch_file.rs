// crates/reelsmith-cli/src/batch_file.rs
//
// The batch description format: a JSON array of task records. Every field
// except `media_files` has a documented default, so a minimal record is just
// the file list.
//
//   [
//     { "media_files": ["a.jpg", "b.jpg"], "output_name": "monday" },
//     { "type": "videos", "media_files": ["x.mp4"], "fill_mode": "blur" }
//   ]

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use reelsmith_core::{FillMode, Job, SourceKind};

#[derive(Debug, Deserialize)]
pub struct TaskEntry {
    #[serde(rename = "type", default = "default_kind")]
    pub kind:               SourceKind,
    #[serde(default)]
    pub media_files:        Vec<PathBuf>,
    #[serde(default)]
    pub audio_file:         Option<PathBuf>,
    /// Defaults to `video_{index}` when absent.
    #[serde(default)]
    pub output_name:        Option<String>,
    #[serde(default = "default_codec")]
    pub codec:              String,
    #[serde(default = "default_bitrate")]
    pub bitrate:            String,
    #[serde(default)]
    pub fill_mode:          FillMode,
    #[serde(default = "default_duration")]
    pub duration_per_image: f64,
    #[serde(default = "default_transitions")]
    pub transitions:        bool,
    #[serde(default = "default_fps")]
    pub fps:                u32,
}

fn default_kind() -> SourceKind { SourceKind::Images }
fn default_codec() -> String { "libx264".into() }
fn default_bitrate() -> String { "4000k".into() }
fn default_duration() -> f64 { 3.0 }
fn default_transitions() -> bool { true }
fn default_fps() -> u32 { 30 }

impl TaskEntry {
    /// Convert to a Job; `index` is the record's position in the file and
    /// feeds the default output name.
    pub fn into_job(self, index: usize) -> Job {
        Job {
            source_kind:       self.kind,
            source_files:      self.media_files,
            audio_file:        self.audio_file,
            output_name:       self.output_name.unwrap_or_else(|| format!("video_{index}")),
            fill_mode:         self.fill_mode,
            duration_per_item: self.duration_per_image,
            use_transitions:   self.transitions,
            codec:             self.codec,
            bitrate:           self.bitrate,
            fps:               self.fps,
        }
    }
}

/// Load and convert a batch description file. Malformed JSON (including an
/// unknown `type` value) rejects the whole file — per-job problems like
/// empty file lists are left for job validation so they fail as individual
/// tasks, not as a file error.
pub fn load_batch_file(path: &Path) -> anyhow::Result<Vec<Job>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read batch file '{}'", path.display()))?;
    let entries: Vec<TaskEntry> = serde_json::from_str(&text)
        .with_context(|| format!("parse batch file '{}'", path.display()))?;
    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| entry.into_job(index))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_record_gets_all_defaults() {
        let entries: Vec<TaskEntry> =
            serde_json::from_str(r#"[{ "media_files": ["a.jpg"] }]"#).unwrap();
        let job = entries.into_iter().next().unwrap().into_job(7);

        assert_eq!(job.source_kind, SourceKind::Images);
        assert_eq!(job.output_name, "video_7");
        assert_eq!(job.codec, "libx264");
        assert_eq!(job.bitrate, "4000k");
        assert_eq!(job.fill_mode, FillMode::Fit);
        assert_eq!(job.duration_per_item, 3.0);
        assert!(job.use_transitions);
        assert_eq!(job.fps, 30);
    }

    #[test]
    fn full_record_round_trips() {
        let json = r#"[{
            "type": "videos",
            "media_files": ["x.mp4", "y.mp4"],
            "audio_file": "music.mp3",
            "output_name": "weekend cut",
            "codec": "libvpx-vp9",
            "bitrate": "8000k",
            "fill_mode": "blur",
            "transitions": false
        }]"#;
        let entries: Vec<TaskEntry> = serde_json::from_str(json).unwrap();
        let job = entries.into_iter().next().unwrap().into_job(0);

        assert_eq!(job.source_kind, SourceKind::Videos);
        assert_eq!(job.source_files.len(), 2);
        assert_eq!(job.audio_file.as_deref(), Some(Path::new("music.mp3")));
        assert_eq!(job.output_name, "weekend cut");
        assert_eq!(job.fill_mode, FillMode::Blur);
        assert!(!job.use_transitions);
    }

    #[test]
    fn unknown_type_rejects_the_file() {
        let parsed: Result<Vec<TaskEntry>, _> =
            serde_json::from_str(r#"[{ "type": "slideshow", "media_files": ["a.jpg"] }]"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn empty_media_files_still_parses() {
        // Validation (not parsing) decides that this task fails.
        let entries: Vec<TaskEntry> = serde_json::from_str(r#"[{}]"#).unwrap();
        let job = entries.into_iter().next().unwrap().into_job(0);
        assert!(job.source_files.is_empty());
        assert!(job.validate().is_err());
    }
}
