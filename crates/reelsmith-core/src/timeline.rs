// crates/reelsmith-core/src/timeline.rs
//
// Timeline data: the ordered sequence of normalized clips plus optional
// crossfade overlap and an optional attached audio track. Assembly (probing
// real files) lives in the media crate; everything here is the duration and
// overlap bookkeeping the exporter relies on.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::geometry::Placement;

/// Fixed crossfade overlap between adjacent image clips, in seconds.
pub const CROSSFADE_SECS: f64 = 0.5;

// ── Clips ─────────────────────────────────────────────────────────────────────

/// What kind of decode the exporter needs for a clip's source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipSource {
    /// One decoded frame, held for the clip's fixed duration.
    Still,
    /// A video stream read frame-by-frame for its native duration.
    Video,
}

/// One source item with its placement resolved against the canvas. Spatial
/// output is always exactly canvas-sized; `duration` is the fixed per-image
/// duration for stills and the probed native duration for videos.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NormalizedClip {
    pub path:      PathBuf,
    pub source:    ClipSource,
    pub duration:  f64,
    /// Probed source dimensions the placement was computed from.
    pub src_size:  (u32, u32),
    pub placement: Placement,
}

/// Background audio attached to a timeline, with its probed duration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioTrack {
    pub path:     PathBuf,
    pub duration: f64,
}

// ── Timeline ──────────────────────────────────────────────────────────────────

/// The assembled, ready-to-encode sequence. Consumed by value by the
/// exporter — a timeline is encoded exactly once.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Timeline {
    pub canvas:    Canvas,
    pub clips:     Vec<NormalizedClip>,
    /// Overlap between adjacent clips in seconds. None = hard cuts.
    pub crossfade: Option<f64>,
    pub audio:     Option<AudioTrack>,
}

impl Timeline {
    /// Total duration in seconds: the clip sum, minus one overlap per
    /// adjacent pair when crossfades are on.
    ///
    /// ```
    /// # use reelsmith_core::timeline::*;
    /// # use reelsmith_core::{Canvas, Placement, FillMode};
    /// # fn clip(d: f64) -> NormalizedClip {
    /// #     NormalizedClip {
    /// #         path: "a.png".into(), source: ClipSource::Still, duration: d,
    /// #         src_size: (1080, 1920),
    /// #         placement: Placement::compute(FillMode::Fit, 1080, 1920, Canvas::default()),
    /// #     }
    /// # }
    /// let t = Timeline {
    ///     canvas: Canvas::default(),
    ///     clips: vec![clip(3.0), clip(3.0), clip(3.0)],
    ///     crossfade: Some(CROSSFADE_SECS),
    ///     audio: None,
    /// };
    /// assert_eq!(t.total_duration(), 3.0 * 3.0 - 0.5 * 2.0);
    /// ```
    pub fn total_duration(&self) -> f64 {
        let sum: f64 = self.clips.iter().map(|c| c.duration).sum();
        match self.crossfade {
            Some(overlap) if self.clips.len() > 1 => {
                sum - overlap * (self.clips.len() - 1) as f64
            }
            _ => sum,
        }
    }

    /// Total output frames at `fps`, computed the same way the encode loop
    /// emits them (per-clip rounding, one overlap's worth of frames removed
    /// per adjacent pair) so progress totals match emitted counts exactly.
    pub fn total_frames(&self, fps: u32) -> u64 {
        let per_clip: u64 = self.clips.iter()
            .map(|c| clip_frames(c.duration, fps))
            .sum();
        let overlap = match self.crossfade {
            Some(secs) if self.clips.len() > 1 => {
                clip_frames(secs, fps) * (self.clips.len() as u64 - 1)
            }
            _ => 0,
        };
        per_clip.saturating_sub(overlap).max(1)
    }
}

/// Frame count for a span of `secs` at `fps`, rounded to nearest.
pub fn clip_frames(secs: f64, fps: u32) -> u64 {
    (secs * fps as f64).round() as u64
}

// ── Audio fitting ─────────────────────────────────────────────────────────────

/// How an attached audio track is adapted to the timeline duration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AudioFit {
    /// Durations already match — attach unchanged.
    Exact,
    /// Audio is longer — cut it at the timeline end.
    Truncate,
    /// Audio is shorter — repeat it seamlessly from the start; the last
    /// repetition is cut at the timeline end.
    Loop { full_loops: u32, partial_secs: f64 },
}

impl AudioFit {
    pub fn compute(audio_secs: f64, timeline_secs: f64) -> AudioFit {
        if audio_secs < timeline_secs {
            let full_loops = (timeline_secs / audio_secs).floor() as u32;
            AudioFit::Loop {
                full_loops,
                partial_secs: timeline_secs - full_loops as f64 * audio_secs,
            }
        } else if audio_secs > timeline_secs {
            AudioFit::Truncate
        } else {
            AudioFit::Exact
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::FillMode;

    fn still(duration: f64) -> NormalizedClip {
        NormalizedClip {
            path:      "img.png".into(),
            source:    ClipSource::Still,
            duration,
            src_size:  (1080, 1920),
            placement: Placement::compute(FillMode::Fit, 1080, 1920, Canvas::default()),
        }
    }

    fn timeline(n: usize, d: f64, crossfade: bool) -> Timeline {
        Timeline {
            canvas:    Canvas::default(),
            clips:     (0..n).map(|_| still(d)).collect(),
            crossfade: crossfade.then_some(CROSSFADE_SECS),
            audio:     None,
        }
    }

    // ── Crossfade duration law ────────────────────────────────────────────────

    #[test]
    fn duration_with_transitions_subtracts_overlaps() {
        for n in 2..6usize {
            let t = timeline(n, 3.0, true);
            let expect = n as f64 * 3.0 - 0.5 * (n as f64 - 1.0);
            assert!((t.total_duration() - expect).abs() < 1e-9, "n={n}");
        }
    }

    #[test]
    fn duration_without_transitions_is_plain_sum() {
        let t = timeline(4, 2.5, false);
        assert_eq!(t.total_duration(), 10.0);
    }

    #[test]
    fn single_clip_ignores_crossfade() {
        let t = timeline(1, 3.0, true);
        assert_eq!(t.total_duration(), 3.0);
    }

    #[test]
    fn frame_total_matches_duration_law_at_30fps() {
        // 3 s clips, 0.5 s overlap: both laws are frame-exact at 30 fps.
        let t = timeline(5, 3.0, true);
        assert_eq!(t.total_frames(30), (t.total_duration() * 30.0).round() as u64);
        let t = timeline(5, 3.0, false);
        assert_eq!(t.total_frames(30), 450);
    }

    #[test]
    fn mixed_native_durations_sum() {
        let mut t = timeline(0, 0.0, false);
        for (d, src) in [(4.2, ClipSource::Video), (1.8, ClipSource::Video)] {
            let mut c = still(d);
            c.source = src;
            t.clips.push(c);
        }
        assert!((t.total_duration() - 6.0).abs() < 1e-9);
    }

    // ── Audio fit law ─────────────────────────────────────────────────────────

    #[test]
    fn audio_shorter_loops_to_exact_cover() {
        let (audio, timeline) = (7.0, 24.5);
        let AudioFit::Loop { full_loops, partial_secs } = AudioFit::compute(audio, timeline)
        else { panic!() };
        assert_eq!(full_loops, 3);
        assert!((partial_secs - 3.5).abs() < 1e-9);
        // No gap, no overlap: whole loops plus the partial equal the timeline.
        assert!((full_loops as f64 * audio + partial_secs - timeline).abs() < 1e-9);
    }

    #[test]
    fn audio_longer_truncates() {
        assert_eq!(AudioFit::compute(30.0, 12.0), AudioFit::Truncate);
    }

    #[test]
    fn audio_equal_attaches_unchanged() {
        assert_eq!(AudioFit::compute(12.0, 12.0), AudioFit::Exact);
    }

    #[test]
    fn audio_dividing_evenly_has_zero_partial() {
        let AudioFit::Loop { full_loops, partial_secs } = AudioFit::compute(5.0, 15.0)
        else { panic!() };
        assert_eq!(full_loops, 3);
        assert!(partial_secs.abs() < 1e-9);
    }
}
