// crates/reelsmith-media/src/probe.rs
//
// In-process FFmpeg probing: source dimensions and durations, gathered before
// any placement is computed. A source that cannot be opened fails here with a
// MediaDecode error naming the path — assembly never proceeds past a broken
// item.

use std::path::PathBuf;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::input;
use ffmpeg::media::Type as MediaType;

use reelsmith_core::{PipelineError, Result};

/// Probed facts about a visual source (still image or video clip).
/// Still images report whatever duration the container claims — the
/// assembler overrides it with the job's per-image duration.
#[derive(Clone, Copy, Debug)]
pub struct MediaInfo {
    pub width:    u32,
    pub height:   u32,
    pub duration: f64,
}

/// Probe a visual source: dimensions from the best video stream, duration
/// from the format with a stream-level fallback.
pub fn probe_visual(path: &PathBuf) -> Result<MediaInfo> {
    let ictx = input(path)
        .map_err(|e| PipelineError::decode(path, e.to_string()))?;

    let stream = ictx
        .streams()
        .best(MediaType::Video)
        .ok_or_else(|| PipelineError::decode(path, "no video stream"))?;

    let params = stream.parameters();
    let (width, height) = (params.width() as u32, params.height() as u32);
    if width == 0 || height == 0 {
        return Err(PipelineError::decode(path, "stream reports zero dimensions"));
    }

    let duration = container_duration(&ictx)
        .or_else(|| stream_duration(&ictx, MediaType::Video))
        .unwrap_or(0.0);

    log::debug!("probed {width}x{height} {duration:.2}s ← {}", path.display());
    Ok(MediaInfo { width, height, duration })
}

/// Probe an audio source's duration. Fails when the file has no audio stream
/// at all — callers have already classified the path as Audio by extension.
pub fn probe_audio(path: &PathBuf) -> Result<f64> {
    let ictx = input(path)
        .map_err(|e| PipelineError::decode(path, e.to_string()))?;

    if ictx.streams().best(MediaType::Audio).is_none() {
        return Err(PipelineError::decode(path, "no audio stream"));
    }

    container_duration(&ictx)
        .or_else(|| stream_duration(&ictx, MediaType::Audio))
        .filter(|d| *d > 0.0)
        .ok_or_else(|| PipelineError::decode(path, "audio duration unknown"))
}

/// Format-level duration in seconds, when the container knows it.
fn container_duration(ictx: &ffmpeg::format::context::Input) -> Option<f64> {
    let dur = ictx.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64;
    (dur > 0.0).then_some(dur)
}

/// Stream-level duration fallback for containers that don't carry one.
fn stream_duration(ictx: &ffmpeg::format::context::Input, kind: MediaType) -> Option<f64> {
    let stream = ictx.streams().best(kind)?;
    let tb = stream.time_base();
    let dur = stream.duration() as f64 * tb.numerator() as f64 / tb.denominator() as f64;
    (dur > 0.0).then_some(dur)
}
