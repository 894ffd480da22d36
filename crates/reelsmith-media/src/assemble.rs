// crates/reelsmith-media/src/assemble.rs
//
// Job → Timeline. Validates the record, probes every source, resolves each
// clip's placement against the canvas, and classifies/attaches the audio
// track. Aborts on the first failing item — a partial timeline is never
// returned.

use reelsmith_core::media_kinds::{classify, MediaKind};
use reelsmith_core::timeline::{AudioTrack, ClipSource, NormalizedClip, Timeline, CROSSFADE_SECS};
use reelsmith_core::{Canvas, FillMode, Job, PipelineError, Placement, Result, SourceKind};

use crate::probe::{probe_audio, probe_visual};

/// Assemble the timeline for one job.
///
/// Image jobs: each source becomes a fixed-duration still, letterboxed (the
/// job's fill mode is ignored for images); crossfades apply when requested
/// and there is more than one clip. Video jobs: native durations, the job's
/// fill mode, hard cuts.
///
/// An audio file that does not classify as Audio by extension is ignored
/// with a warning — not an error. One that classifies as Audio but cannot
/// be probed fails the job.
pub fn assemble_timeline(job: &Job, canvas: Canvas) -> Result<Timeline> {
    job.validate()?;

    let mut clips = Vec::with_capacity(job.source_files.len());
    for path in &job.source_files {
        let info = probe_visual(path)?;

        let (source, duration, mode) = match job.source_kind {
            SourceKind::Images => (ClipSource::Still, job.duration_per_item, FillMode::Fit),
            SourceKind::Videos => (ClipSource::Video, info.duration, job.fill_mode),
        };
        if duration <= 0.0 {
            return Err(PipelineError::decode(path, "source has no usable duration"));
        }

        clips.push(NormalizedClip {
            path: path.clone(),
            source,
            duration,
            src_size: (info.width, info.height),
            placement: Placement::compute(mode, info.width, info.height, canvas),
        });
    }

    let crossfade = (job.source_kind == SourceKind::Images
        && job.use_transitions
        && clips.len() > 1)
        .then_some(CROSSFADE_SECS);

    let audio = match &job.audio_file {
        Some(path) if classify(path) == MediaKind::Audio => {
            let duration = probe_audio(path)?;
            Some(AudioTrack { path: path.clone(), duration })
        }
        Some(path) => {
            log::warn!("'{}' is not an audio file — ignoring it", path.display());
            None
        }
        None => None,
    };

    log::info!(
        "assembled {} clip(s), crossfade {:?}, audio {}",
        clips.len(),
        crossfade,
        audio.as_ref().map(|a| a.path.display().to_string()).unwrap_or_else(|| "none".into()),
    );

    Ok(Timeline { canvas, clips, crossfade, audio })
}
