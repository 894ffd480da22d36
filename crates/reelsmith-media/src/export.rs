// crates/reelsmith-media/src/export.rs
//
// Timeline → encoded file.
//
// Design:
//   • `ExportSettings` — codec/bitrate/fps, resolved from strings up front so
//     a bad setting fails before any frame is decoded.
//   • `export_timeline()` — blocking; consumes the timeline. Creates parent
//     directories, mixes the attached audio into a temporary WAV artifact
//     (RAII-removed on every exit path), then drives the encode loop.
//   • `Muxer` / `AudioSink` — encoder + muxer state threaded through the
//     frame loop.
//
// Stream layout in the output container:
//   Stream 0 — video (YUV420P, bitrate-driven)
//   Stream 1 — audio (FLTP stereo; AAC, or Opus for WebM), only when the
//              timeline has an attached track
//
// PTS strategy:
//   Video: monotonically increasing frame counter in 1/fps.
//   Audio: monotonically increasing sample counter in 1/rate.
//   Both start at zero, so multi-clip concatenation and crossfade overlaps
//   introduce no discontinuities.
//
// Frame accounting for crossfades: each clip contributes
// `round(duration × fps)` frames, minus the overlap frames it shares with
// its neighbours; every adjacent pair contributes one overlap's worth of
// blended frames. Summed, that reproduces the timeline duration law exactly.

use std::path::Path;

use crossbeam_channel::Sender;
use uuid::Uuid;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::codec::{self, Id as CodecId};
use ffmpeg::encoder;
use ffmpeg::format::sample::Type as SampleType;
use ffmpeg::format::{output as open_output, Pixel, Sample};
use ffmpeg::software::scaling::{Context as ScaleCtx, Flags as ScaleFlags};
use ffmpeg::util::channel_layout::{ChannelLayout, ChannelLayoutMask};
use ffmpeg::util::frame::audio::Audio as AudioFrame;
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::util::rational::Rational;
use ffmpeg::Packet;

use reelsmith_core::compose::{blend_rgba, compose, ease_in_out, frame_alpha, Frame};
use reelsmith_core::timeline::{clip_frames, ClipSource, NormalizedClip, Timeline};
use reelsmith_core::{Canvas, Job, PipelineError, Placement, Result};

use crate::audio::{decode_pcm, fit_pcm, write_wav, CHANNELS};
use crate::frames::{decode_still, ClipReader};

// ── Public types ──────────────────────────────────────────────────────────────

/// Encoder parameters for one export, still in their submission form.
#[derive(Clone, Debug)]
pub struct ExportSettings {
    pub codec:   String,
    pub bitrate: String,
    pub fps:     u32,
}

impl ExportSettings {
    pub fn from_job(job: &Job) -> Self {
        Self { codec: job.codec.clone(), bitrate: job.bitrate.clone(), fps: job.fps }
    }
}

/// Periodic progress while a timeline encodes.
#[derive(Clone, Copy, Debug)]
pub struct ExportProgress {
    pub frame:        u64,
    pub total_frames: u64,
}

/// Send a progress update every this many encoded video frames.
const PROGRESS_INTERVAL: u64 = 15;

// ── Codec / bitrate resolution ────────────────────────────────────────────────

/// Container extension for a codec name, per the export format table.
pub fn extension_for_codec(codec: &str) -> &'static str {
    match codec {
        "libvpx-vp9" | "vp9" => ".webm",
        "mpeg4"              => ".avi",
        _                    => ".mp4",
    }
}

fn video_codec_id(codec: &str) -> Option<CodecId> {
    match codec {
        "libx264" | "h264"   => Some(CodecId::H264),
        "libx265" | "hevc"   => Some(CodecId::HEVC),
        "libvpx-vp9" | "vp9" => Some(CodecId::VP9),
        "mpeg4"              => Some(CodecId::MPEG4),
        _                    => None,
    }
}

/// Parse a bitrate string: `"4000k"` → 4 000 000, `"5M"` → 5 000 000,
/// plain digits pass through.
pub fn parse_bitrate(s: &str) -> Option<usize> {
    let s = s.trim();
    let (digits, factor) = match s.chars().last()? {
        'k' | 'K' => (&s[..s.len() - 1], 1_000),
        'm' | 'M' => (&s[..s.len() - 1], 1_000_000),
        _         => (s, 1),
    };
    let value: usize = digits.parse().ok()?;
    (value > 0).then_some(value * factor)
}

/// Audio codec + sample rate for the output container. WebM cannot carry
/// AAC, so VP9 exports get Opus at its native 48 kHz.
fn audio_codec_for(output: &Path) -> (CodecId, u32) {
    let webm = output.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("webm"));
    if webm {
        (CodecId::OPUS, 48_000)
    } else {
        (CodecId::AAC, 44_100)
    }
}

// ── Public entry point ────────────────────────────────────────────────────────

/// Encode `timeline` to `output`. Blocking; the timeline is consumed.
///
/// Parent directories are created if absent. When the timeline carries audio,
/// the mixed track is written to a temporary WAV whose removal is guaranteed
/// by its RAII guard — the artifact never outlives this call, on success or
/// failure. Encoder faults come back as `Export` errors; source decode
/// faults as `MediaDecode`.
pub fn export_timeline(
    timeline: Timeline,
    output:   &Path,
    settings: &ExportSettings,
    progress: Option<&Sender<ExportProgress>>,
) -> Result<()> {
    if timeline.clips.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let codec_id = video_codec_id(&settings.codec)
        .ok_or_else(|| PipelineError::Export(format!("unsupported codec '{}'", settings.codec)))?;
    let bit_rate = parse_bitrate(&settings.bitrate)
        .ok_or_else(|| PipelineError::Export(format!("invalid bitrate '{}'", settings.bitrate)))?;
    if settings.fps == 0 {
        return Err(PipelineError::Export("fps must be positive".into()));
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PipelineError::Export(format!("create output directory '{}': {e}", parent.display()))
            })?;
        }
    }

    // ── Mix audio and write the intermediate artifact ─────────────────────────
    // `_artifact` holds the NamedTempFile until this function returns; its
    // Drop removes the file on every path out of here.
    let (audio_codec, audio_rate) = audio_codec_for(output);
    let (pcm, _artifact) = match &timeline.audio {
        Some(track) => {
            let raw = decode_pcm(&track.path, audio_rate)?;
            let fitted = fit_pcm(&raw, timeline.total_duration(), audio_rate);
            // Artifact name carries this export's id so concurrent jobs can
            // never collide on it.
            let mut tmp = tempfile::Builder::new()
                .prefix(&format!("reelsmith_audio_{}_", Uuid::new_v4().simple()))
                .suffix(".wav")
                .tempfile()
                .map_err(|e| PipelineError::Export(format!("create temp audio artifact: {e}")))?;
            write_wav(&mut tmp, &fitted, audio_rate)
                .map_err(|e| PipelineError::Export(format!("write temp audio artifact: {e}")))?;
            log::debug!("mixed audio artifact at {}", tmp.path().display());
            (Some(fitted), Some(tmp))
        }
        None => (None, None),
    };

    run_encode(&timeline, output, codec_id, bit_rate, settings, audio_codec, audio_rate, pcm, progress)
}

// ── Encode loop ───────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn run_encode(
    timeline:    &Timeline,
    output:      &Path,
    codec_id:    CodecId,
    bit_rate:    usize,
    settings:    &ExportSettings,
    audio_codec: CodecId,
    audio_rate:  u32,
    pcm:         Option<Vec<f32>>,
    progress:    Option<&Sender<ExportProgress>>,
) -> Result<()> {
    let canvas = timeline.canvas;
    let fps = settings.fps;
    let out_path = output.to_path_buf();

    let mut octx = open_output(&out_path)
        .map_err(|e| PipelineError::Export(format!("open output '{}': {e}", output.display())))?;

    // ── Video encoder (stream 0) ──────────────────────────────────────────────
    // The codec context is created independently of the output stream; its
    // parameters are copied onto the stream's codecpar below.
    let frame_tb = Rational::new(1, fps as i32);

    let vcodec = encoder::find(codec_id)
        .ok_or_else(|| PipelineError::Export(format!("encoder for '{}' not available", settings.codec)))?;

    let mut ost_video = octx.add_stream(vcodec)
        .map_err(|e| PipelineError::Export(format!("add video stream: {e}")))?;
    ost_video.set_time_base(frame_tb);

    let venc_ctx = codec::context::Context::new_with_codec(vcodec);
    let mut venc = venc_ctx.encoder().video()
        .map_err(|e| PipelineError::Export(format!("create video encoder context: {e}")))?;

    venc.set_width(canvas.width);
    venc.set_height(canvas.height);
    venc.set_format(Pixel::YUV420P);
    venc.set_time_base(frame_tb);
    venc.set_frame_rate(Some(Rational::new(fps as i32, 1)));
    venc.set_bit_rate(bit_rate);

    let mut video_encoder = venc.open_as_with(vcodec, ffmpeg::Dictionary::new())
        .map_err(|e| PipelineError::Export(format!("open '{}' encoder: {e}", settings.codec)))?;

    // Square pixels must be set on the OPENED context — libavcodec resets
    // sample_aspect_ratio during codec initialisation, clobbering anything
    // set before the open.
    video_encoder.set_aspect_ratio(Rational::new(1, 1));

    // Copy encoder params onto the stream's codecpar so the muxer has
    // resolution, format, and codec-private data. encoder::Video does not
    // satisfy the set_parameters trait bound, so this goes through FFI.
    unsafe {
        let ret = ffmpeg::ffi::avcodec_parameters_from_context(
            (**(*octx.as_mut_ptr()).streams.add(0)).codecpar,
            video_encoder.as_ptr() as *mut ffmpeg::ffi::AVCodecContext,
        );
        if ret < 0 {
            return Err(PipelineError::Export(format!(
                "avcodec_parameters_from_context (video) failed: {ret}"
            )));
        }
    }

    // ── Audio encoder (stream 1, only with an attached track) ─────────────────
    let mut audio_sink = match pcm {
        Some(pcm) => {
            let acodec = encoder::find(audio_codec)
                .ok_or_else(|| PipelineError::Export(format!("{audio_codec:?} encoder not found")))?;

            let audio_tb = Rational::new(1, audio_rate as i32);
            let mut ost_audio = octx.add_stream(acodec)
                .map_err(|e| PipelineError::Export(format!("add audio stream: {e}")))?;
            ost_audio.set_time_base(audio_tb);

            let aenc_ctx = codec::context::Context::new_with_codec(acodec);
            let mut aenc = aenc_ctx.encoder().audio()
                .map_err(|e| PipelineError::Export(format!("create audio encoder context: {e}")))?;

            aenc.set_rate(audio_rate as i32);
            aenc.set_ch_layout(ChannelLayout::STEREO);
            aenc.set_format(Sample::F32(SampleType::Planar));
            aenc.set_bit_rate(128_000);

            let audio_encoder = aenc.open_as_with(acodec, ffmpeg::Dictionary::new())
                .map_err(|e| PipelineError::Export(format!("open {audio_codec:?} encoder: {e}")))?;

            let frame_size = match audio_encoder.frame_size() as usize {
                0 => 1024,
                n => n,
            };

            unsafe {
                let ret = ffmpeg::ffi::avcodec_parameters_from_context(
                    (**(*octx.as_mut_ptr()).streams.add(1)).codecpar,
                    audio_encoder.as_ptr() as *mut ffmpeg::ffi::AVCodecContext,
                );
                if ret < 0 {
                    return Err(PipelineError::Export(format!(
                        "avcodec_parameters_from_context (audio) failed: {ret}"
                    )));
                }
            }

            Some(AudioSink {
                pcm,
                pos: 0,
                rate: audio_rate,
                left: Vec::new(),
                right: Vec::new(),
                encoder: audio_encoder,
                frame_size,
                next_pts: 0,
                audio_tb,
                ost_tb: audio_tb, // re-read from the muxer after write_header
            })
        }
        None => None,
    };

    octx.write_header()
        .map_err(|e| PipelineError::Export(format!("write output header: {e}")))?;

    let ost_video_tb = octx.stream(0).unwrap().time_base();
    if let Some(sink) = &mut audio_sink {
        sink.ost_tb = octx.stream(1).unwrap().time_base();
    }

    let rgba_to_yuv = ScaleCtx::get(
        Pixel::RGBA,    canvas.width, canvas.height,
        Pixel::YUV420P, canvas.width, canvas.height,
        ScaleFlags::BILINEAR,
    ).map_err(|e| PipelineError::Export(format!("create RGBA→YUV converter: {e}")))?;

    let mut muxer = Muxer {
        octx,
        video: video_encoder,
        rgba_to_yuv,
        frame_tb,
        ost_video_tb,
        canvas,
        fps,
        out_frame_idx: 0,
        total_frames: timeline.total_frames(fps),
        audio: audio_sink,
    };

    // ── Per-clip frame loop ───────────────────────────────────────────────────
    let n = timeline.clips.len();
    let overlap: u64 = match timeline.crossfade {
        Some(secs) if n > 1 => clip_frames(secs, fps),
        _ => 0,
    };

    let mut current = RenderedClip::open(&timeline.clips[0], canvas)?;
    for i in 0..n {
        let clip = &timeline.clips[i];
        let clip_total = clip_frames(clip.duration, fps);
        let head = if i > 0 { overlap } else { 0 };
        let tail = if i + 1 < n { overlap } else { 0 };
        let body = clip_total.saturating_sub(head + tail);

        // Body frames: local clip time starts after any head overlap the
        // previous pair already emitted as blended frames.
        for f in 0..body {
            let t = (head + f) as f64 / fps as f64;
            let rgba = current.frame_at(t)?;
            muxer.write_rgba(&rgba, progress)?;
        }

        if i + 1 < n {
            let mut next = RenderedClip::open(&timeline.clips[i + 1], canvas)?;
            for k in 0..tail {
                let alpha = ease_in_out(frame_alpha(k as usize, tail as usize));
                let blended = {
                    let ta = (head + body + k) as f64 / fps as f64;
                    let a = current.frame_at(ta)?;
                    let b = next.frame_at(k as f64 / fps as f64)?;
                    blend_rgba(&a, &b, alpha)
                };
                muxer.write_rgba(&blended, progress)?;
            }
            current = next;
        }
    }

    muxer.finish()?;
    log::info!("exported {} frames → {}", timeline.total_frames(fps), output.display());
    Ok(())
}

// ── Rendered clips ────────────────────────────────────────────────────────────

/// One timeline clip, opened for frame production at canvas size.
///
/// Stills are composed once and replayed; videos are decoded on demand.
/// Blur-mode clips additionally read the source stretched to the full canvas
/// for the background layer (a second sequential decode of the same file).
enum RenderedClip {
    Still {
        frame: Frame,
    },
    Video {
        reader:    ClipReader,
        stretched: Option<ClipReader>,
        placement: Placement,
        canvas:    Canvas,
    },
}

impl RenderedClip {
    fn open(clip: &NormalizedClip, canvas: Canvas) -> Result<Self> {
        let (sw, sh) = clip.placement.scaled();
        let needs_bg = matches!(clip.placement, Placement::Blur { .. })
            && !clip.placement.is_degenerate(canvas);

        match clip.source {
            ClipSource::Still => {
                let scaled = Frame::from_rgba(sw, sh, decode_still(&clip.path, sw, sh)?);
                let stretched = if needs_bg {
                    Some(Frame::from_rgba(
                        canvas.width,
                        canvas.height,
                        decode_still(&clip.path, canvas.width, canvas.height)?,
                    ))
                } else {
                    None
                };
                let frame = compose(&clip.placement, &scaled, stretched.as_ref(), canvas);
                Ok(RenderedClip::Still { frame })
            }
            ClipSource::Video => {
                let reader = ClipReader::open(&clip.path, sw, sh)?;
                let stretched = if needs_bg {
                    Some(ClipReader::open(&clip.path, canvas.width, canvas.height)?)
                } else {
                    None
                };
                Ok(RenderedClip::Video { reader, stretched, placement: clip.placement, canvas })
            }
        }
    }

    /// Canvas-size RGBA for local clip time `t` (monotonically increasing).
    fn frame_at(&mut self, t: f64) -> Result<std::borrow::Cow<'_, [u8]>> {
        match self {
            RenderedClip::Still { frame } => Ok(std::borrow::Cow::Borrowed(&frame.data)),
            RenderedClip::Video { reader, stretched, placement, canvas } => {
                let (sw, sh) = placement.scaled();
                let fg = Frame::from_rgba(sw, sh, reader.frame_at(t)?.to_vec());
                let bg = match stretched {
                    Some(r) => Some(Frame::from_rgba(
                        canvas.width,
                        canvas.height,
                        r.frame_at(t)?.to_vec(),
                    )),
                    None => None,
                };
                let composed = compose(placement, &fg, bg.as_ref(), *canvas);
                Ok(std::borrow::Cow::Owned(composed.data))
            }
        }
    }
}

// ── Muxer ─────────────────────────────────────────────────────────────────────

/// Encoder + muxer state threaded through the frame loop.
struct Muxer {
    octx:          ffmpeg::format::context::Output,
    video:         ffmpeg::encoder::Video,
    rgba_to_yuv:   ScaleCtx,
    frame_tb:      Rational,
    ost_video_tb:  Rational,
    canvas:        Canvas,
    fps:           u32,
    out_frame_idx: i64,
    total_frames:  u64,
    audio:         Option<AudioSink>,
}

impl Muxer {
    /// Convert one packed canvas-size RGBA frame to YUV420P, encode it, and
    /// interleave the matching slice of audio behind it.
    fn write_rgba(&mut self, rgba: &[u8], progress: Option<&Sender<ExportProgress>>) -> Result<()> {
        debug_assert_eq!(rgba.len(), self.canvas.rgba_len());
        let (w, h) = (self.canvas.width, self.canvas.height);

        let mut src = VideoFrame::new(Pixel::RGBA, w, h);
        {
            let stride = src.stride(0);
            let dst = src.data_mut(0);
            let row = w as usize * 4;
            for y in 0..h as usize {
                dst[y * stride..y * stride + row].copy_from_slice(&rgba[y * row..(y + 1) * row]);
            }
        }

        let mut yuv = VideoFrame::empty();
        self.rgba_to_yuv.run(&src, &mut yuv)
            .map_err(|e| PipelineError::Export(format!("convert frame to YUV: {e}")))?;
        yuv.set_pts(Some(self.out_frame_idx));
        // The scaler inherits a 0:1 SAR onto the output frame; force square
        // pixels so players don't letterbox. No safe setter exists.
        unsafe {
            (*yuv.as_mut_ptr()).sample_aspect_ratio =
                ffmpeg::ffi::AVRational { num: 1, den: 1 };
        }

        self.video.send_frame(&yuv)
            .map_err(|e| PipelineError::Export(format!("send video frame: {e}")))?;

        let mut pkt = Packet::empty();
        while self.video.receive_packet(&mut pkt).is_ok() {
            pkt.set_stream(0);
            pkt.rescale_ts(self.frame_tb, self.ost_video_tb);
            pkt.write_interleaved(&mut self.octx)
                .map_err(|e| PipelineError::Export(format!("write video packet: {e}")))?;
        }

        self.out_frame_idx += 1;

        if let Some(sink) = &mut self.audio {
            sink.feed(self.out_frame_idx, self.fps, &mut self.octx)?;
        }

        if self.out_frame_idx as u64 % PROGRESS_INTERVAL == 0 {
            if let Some(tx) = progress {
                let _ = tx.send(ExportProgress {
                    frame:        self.out_frame_idx as u64,
                    total_frames: self.total_frames,
                });
            }
        }
        Ok(())
    }

    /// Flush both encoders and finalize the container.
    fn finish(mut self) -> Result<()> {
        self.video.send_eof()
            .map_err(|e| PipelineError::Export(format!("flush video encoder: {e}")))?;
        let mut pkt = Packet::empty();
        while self.video.receive_packet(&mut pkt).is_ok() {
            pkt.set_stream(0);
            pkt.rescale_ts(self.frame_tb, self.ost_video_tb);
            pkt.write_interleaved(&mut self.octx)
                .map_err(|e| PipelineError::Export(format!("write flush video packet: {e}")))?;
        }

        if let Some(sink) = &mut self.audio {
            sink.finish(&mut self.octx)?;
        }

        self.octx.write_trailer()
            .map_err(|e| PipelineError::Export(format!("write trailer: {e}")))?;
        Ok(())
    }
}

// ── Audio sink ────────────────────────────────────────────────────────────────

/// Feeds the fitted PCM into the audio encoder in step with the video
/// frames. Decoded samples sit in a stereo planar FIFO; full encoder-sized
/// frames are popped off the front, and the tail is zero-padded on the final
/// flush so no samples are lost.
struct AudioSink {
    pcm:        Vec<f32>,
    /// Interleaved samples already moved into the FIFO.
    pos:        usize,
    rate:       u32,
    left:       Vec<f32>,
    right:      Vec<f32>,
    encoder:    ffmpeg::encoder::Audio,
    frame_size: usize,
    /// Next output frame's PTS in samples (timebase 1/rate).
    next_pts:   i64,
    audio_tb:   Rational,
    /// Muxer-assigned timebase for stream 1 (may differ from audio_tb).
    ost_tb:     Rational,
}

impl AudioSink {
    /// Buffer PCM up to the video position `frames_done / fps` and drain
    /// full encoder frames.
    fn feed(
        &mut self,
        frames_done: i64,
        fps:         u32,
        octx:        &mut ffmpeg::format::context::Output,
    ) -> Result<()> {
        let per_channel = ((frames_done as f64 / fps as f64) * self.rate as f64).round() as usize;
        let target = (per_channel * CHANNELS).min(self.pcm.len());
        if target > self.pos {
            for pair in self.pcm[self.pos..target].chunks_exact(CHANNELS) {
                self.left.push(pair[0]);
                self.right.push(pair[1]);
            }
            self.pos = target;
        }
        self.drain(octx, false)
    }

    /// Push any remaining PCM, flush the FIFO tail, and EOF the encoder.
    fn finish(&mut self, octx: &mut ffmpeg::format::context::Output) -> Result<()> {
        if self.pos < self.pcm.len() {
            for pair in self.pcm[self.pos..].chunks_exact(CHANNELS) {
                self.left.push(pair[0]);
                self.right.push(pair[1]);
            }
            self.pos = self.pcm.len();
        }
        self.drain(octx, true)?;
        self.encoder.send_eof()
            .map_err(|e| PipelineError::Export(format!("flush audio encoder: {e}")))?;
        self.drain_packets(octx)
    }

    /// Pop full frames off the FIFO and encode them. With `flush` set, a
    /// final partial frame is zero-padded and sent too.
    fn drain(&mut self, octx: &mut ffmpeg::format::context::Output, flush: bool) -> Result<()> {
        while self.left.len() >= self.frame_size || (flush && !self.left.is_empty()) {
            let frame = self.pop_frame();
            self.next_pts += self.frame_size as i64;
            self.encoder.send_frame(&frame)
                .map_err(|e| PipelineError::Export(format!("send audio frame: {e}")))?;
            self.drain_packets(octx)?;
        }
        Ok(())
    }

    /// Build one encoder-sized FLTP frame from the FIFO front, zero-padding
    /// a short tail.
    fn pop_frame(&mut self) -> AudioFrame {
        let n = self.frame_size;
        let available = self.left.len().min(n);

        let mut frame = AudioFrame::new(
            Sample::F32(SampleType::Planar),
            n,
            ChannelLayoutMask::STEREO,
        );
        frame.set_rate(self.rate);
        frame.set_pts(Some(self.next_pts));

        unsafe {
            let ldata = frame.data_mut(0);
            let ldst = std::slice::from_raw_parts_mut(ldata.as_mut_ptr() as *mut f32, n);
            ldst[..available].copy_from_slice(&self.left[..available]);
            if available < n {
                ldst[available..].fill(0.0);
            }

            let rdata = frame.data_mut(1);
            let rdst = std::slice::from_raw_parts_mut(rdata.as_mut_ptr() as *mut f32, n);
            rdst[..available].copy_from_slice(&self.right[..available]);
            if available < n {
                rdst[available..].fill(0.0);
            }
        }

        self.left.drain(..available);
        self.right.drain(..available);
        frame
    }

    /// Receive all pending encoded packets and write them interleaved.
    fn drain_packets(&mut self, octx: &mut ffmpeg::format::context::Output) -> Result<()> {
        let mut pkt = Packet::empty();
        while self.encoder.receive_packet(&mut pkt).is_ok() {
            pkt.set_stream(1);
            pkt.rescale_ts(self.audio_tb, self.ost_tb);
            pkt.write_interleaved(octx)
                .map_err(|e| PipelineError::Export(format!("write audio packet: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitrate_parsing() {
        assert_eq!(parse_bitrate("4000k"), Some(4_000_000));
        assert_eq!(parse_bitrate("8000K"), Some(8_000_000));
        assert_eq!(parse_bitrate("5M"), Some(5_000_000));
        assert_eq!(parse_bitrate("128000"), Some(128_000));
        assert_eq!(parse_bitrate("fast"), None);
        assert_eq!(parse_bitrate(""), None);
        assert_eq!(parse_bitrate("0k"), None);
    }

    #[test]
    fn codec_extension_table() {
        assert_eq!(extension_for_codec("libx264"), ".mp4");
        assert_eq!(extension_for_codec("libx265"), ".mp4");
        assert_eq!(extension_for_codec("libvpx-vp9"), ".webm");
        assert_eq!(extension_for_codec("mpeg4"), ".avi");
    }

    #[test]
    fn known_codecs_resolve() {
        for name in ["libx264", "libx265", "libvpx-vp9", "mpeg4"] {
            assert!(video_codec_id(name).is_some(), "{name}");
        }
        assert!(video_codec_id("prores").is_none());
    }

    #[test]
    fn webm_gets_opus_at_48k() {
        let (codec, rate) = audio_codec_for(Path::new("out/x.webm"));
        assert!(matches!(codec, CodecId::OPUS));
        assert_eq!(rate, 48_000);
        let (codec, rate) = audio_codec_for(Path::new("out/x.mp4"));
        assert!(matches!(codec, CodecId::AAC));
        assert_eq!(rate, 44_100);
    }
}
