// crates/reelsmith-media/src/audio.rs
//
// Background-audio handling for export: decode any audio source to
// interleaved f32 PCM at the output rate, fit it to the timeline duration
// (loop shorter tracks, truncate longer ones — exactly, at sample
// precision), and write the intermediate WAV artifact the encoder stage
// consumes.
//
// All decoding is in-process via ffmpeg-the-third — no child process, no
// PATH dependency.

use std::io::Write;
use std::path::PathBuf;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::input;
use ffmpeg::format::sample::{Sample, Type as SampleType};
use ffmpeg::media::Type as MediaType;
use ffmpeg::software::resampling;
use ffmpeg::util::channel_layout::ChannelLayout;
use ffmpeg::util::frame::audio::Audio as AudioFrame;

use reelsmith_core::{PipelineError, Result};

/// Output channel count. Everything downstream is stereo; mono sources are
/// upmixed by duplicating the single channel.
pub const CHANNELS: usize = 2;

/// Decoded interleaved format: packed f32 little-endian.
const PCM_FMT: Sample = Sample::F32(SampleType::Packed);

// ── Decode ────────────────────────────────────────────────────────────────────

/// Decode all audio from `path`, resampled to `rate` Hz stereo interleaved
/// f32. The resampler is built lazily on the first decoded frame so the real
/// source format is known before the SwrContext exists.
pub fn decode_pcm(path: &PathBuf, rate: u32) -> Result<Vec<f32>> {
    let mut ictx = input(path)
        .map_err(|e| PipelineError::decode(path, e.to_string()))?;

    let audio_idx = ictx
        .streams()
        .best(MediaType::Audio)
        .ok_or_else(|| PipelineError::decode(path, "no audio stream"))?
        .index();

    let dec_ctx = ffmpeg::codec::context::Context::from_parameters(
        ictx.stream(audio_idx).unwrap().parameters(),
    ).map_err(|e| PipelineError::decode(path, format!("codec context: {e}")))?;
    let mut decoder = dec_ctx.decoder().audio()
        .map_err(|e| PipelineError::decode(path, format!("audio decoder: {e}")))?;

    let mut resampler: Option<resampling::Context> = None;
    let mut pcm: Vec<f32> = Vec::new();

    for result in ictx.packets() {
        let Ok((stream, packet)) = result else { continue };
        if stream.index() != audio_idx {
            continue;
        }
        if decoder.send_packet(&packet).is_err() {
            continue;
        }
        let mut frame = AudioFrame::empty();
        while decoder.receive_frame(&mut frame).is_ok() {
            append_resampled(&frame, rate, &mut resampler, &mut pcm)?;
        }
    }

    let _ = decoder.send_eof();
    let mut frame = AudioFrame::empty();
    while decoder.receive_frame(&mut frame).is_ok() {
        append_resampled(&frame, rate, &mut resampler, &mut pcm)?;
    }

    if pcm.is_empty() {
        return Err(PipelineError::decode(path, "no audio samples decoded"));
    }
    Ok(pcm)
}

/// Resample `frame` to stereo interleaved f32 at `rate` and append to `out`.
fn append_resampled(
    frame:     &AudioFrame,
    rate:      u32,
    resampler: &mut Option<resampling::Context>,
    out:       &mut Vec<f32>,
) -> Result<()> {
    let src_channels = frame.ch_layout().channels();
    let needs_resample = frame.format() != PCM_FMT
        || frame.rate()                != rate
        || src_channels as usize       != CHANNELS;

    if !needs_resample {
        append_packed_f32(frame, out);
        return Ok(());
    }

    if resampler.is_none() {
        // Mono sources must be declared as MONO or swr misreads the layout.
        let src_layout = if src_channels >= 2 {
            frame.ch_layout()
        } else {
            ChannelLayout::MONO
        };
        let ctx = resampling::Context::get2(
            frame.format(), src_layout,            frame.rate(),
            PCM_FMT,        ChannelLayout::STEREO, rate,
        ).map_err(|e| PipelineError::Export(format!("create audio resampler: {e}")))?;
        *resampler = Some(ctx);
    }

    let rs = resampler.as_mut().unwrap();
    let mut resampled = AudioFrame::empty();
    if rs.run(frame, &mut resampled).is_ok() && resampled.samples() > 0 {
        append_packed_f32(&resampled, out);
    }
    Ok(())
}

/// Copy packed interleaved f32 samples from plane 0 into `out`.
fn append_packed_f32(frame: &AudioFrame, out: &mut Vec<f32>) {
    let n = frame.samples() * CHANNELS * 4;
    let data = &frame.data(0)[..n];
    out.extend(
        data.chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
    );
}

// ── Fit to timeline ───────────────────────────────────────────────────────────

/// Loop or truncate interleaved stereo PCM to exactly `target_secs` at
/// `rate`. A shorter track repeats seamlessly from its start, the final
/// repetition cut at the target; a longer track is cut there directly.
pub fn fit_pcm(pcm: &[f32], target_secs: f64, rate: u32) -> Vec<f32> {
    let target = (target_secs * rate as f64).round() as usize * CHANNELS;
    if pcm.is_empty() || target == 0 {
        return vec![0.0; target];
    }
    pcm.iter().copied().cycle().take(target).collect()
}

// ── WAV artifact ──────────────────────────────────────────────────────────────

/// Write interleaved stereo f32le PCM as a WAV stream.
/// Returns total bytes written (header + data).
///
/// Layout:
///   RIFF  <file_size - 8>  WAVE
///   fmt   16  <format=3 IEEE_FLOAT>  <channels=2>  <rate>
///             <byte_rate>  <block_align=8>  <bits=32>
///   data  <data_size>  <samples…>
pub fn write_wav<W: Write>(w: &mut W, samples: &[f32], rate: u32) -> std::io::Result<u64> {
    const BITS:         u16 = 32;
    const FORMAT_FLOAT: u16 = 3; // IEEE_FLOAT
    const BLOCK_ALIGN:  u16 = (CHANNELS as u16) * (BITS / 8);

    let data_size = (samples.len() * 4) as u32;
    let byte_rate = rate * BLOCK_ALIGN as u32;

    w.write_all(b"RIFF")?;
    w.write_all(&(36u32 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")?;

    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&FORMAT_FLOAT.to_le_bytes())?;
    w.write_all(&(CHANNELS as u16).to_le_bytes())?;
    w.write_all(&rate.to_le_bytes())?;
    w.write_all(&byte_rate.to_le_bytes())?;
    w.write_all(&BLOCK_ALIGN.to_le_bytes())?;
    w.write_all(&BITS.to_le_bytes())?;

    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for s in samples {
        w.write_all(&s.to_le_bytes())?;
    }
    w.flush()?;

    Ok((44 + data_size) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelsmith_core::timeline::AudioFit;

    const RATE: u32 = 44_100;

    fn track(secs: f64) -> Vec<f32> {
        // Deterministic non-repeating content so loop seams are checkable.
        let n = (secs * RATE as f64).round() as usize * CHANNELS;
        (0..n).map(|i| (i % 1000) as f32 / 1000.0).collect()
    }

    #[test]
    fn fit_truncates_longer_audio_exactly() {
        let pcm = track(10.0);
        let out = fit_pcm(&pcm, 4.0, RATE);
        assert_eq!(out.len(), 4 * RATE as usize * CHANNELS);
        assert_eq!(out[..], pcm[..out.len()]);
    }

    #[test]
    fn fit_loops_shorter_audio_without_gap() {
        let pcm = track(2.0);
        let out = fit_pcm(&pcm, 5.0, RATE);
        assert_eq!(out.len(), 5 * RATE as usize * CHANNELS);
        // Every output sample is the source sample at its loop position.
        for (i, &s) in out.iter().enumerate().step_by(977) {
            assert_eq!(s, pcm[i % pcm.len()], "loop seam broken at {i}");
        }
        // Agreement with the timeline-side law: 2 whole loops + 1 s partial.
        let AudioFit::Loop { full_loops, partial_secs } = AudioFit::compute(2.0, 5.0)
        else { panic!() };
        assert_eq!(full_loops, 2);
        let expected = (full_loops as f64 * 2.0 + partial_secs) * RATE as f64;
        assert_eq!(out.len(), expected.round() as usize * CHANNELS);
    }

    #[test]
    fn fit_equal_duration_is_identity() {
        let pcm = track(3.0);
        assert_eq!(fit_pcm(&pcm, 3.0, RATE), pcm);
    }

    #[test]
    fn wav_header_fields() {
        let samples = vec![0.25f32; 8];
        let mut buf = Vec::new();
        let written = write_wav(&mut buf, &samples, RATE).unwrap();
        assert_eq!(written as usize, buf.len());
        assert_eq!(&buf[0..4], b"RIFF");
        assert_eq!(&buf[8..12], b"WAVE");
        assert_eq!(&buf[12..16], b"fmt ");
        // format tag 3 (IEEE float), 2 channels, 44100 Hz
        assert_eq!(u16::from_le_bytes([buf[20], buf[21]]), 3);
        assert_eq!(u16::from_le_bytes([buf[22], buf[23]]), 2);
        assert_eq!(u32::from_le_bytes([buf[24], buf[25], buf[26], buf[27]]), RATE);
        // data chunk size = samples * 4 bytes
        assert_eq!(u32::from_le_bytes([buf[40], buf[41], buf[42], buf[43]]), 32);
    }
}
