// crates/reelsmith-media/src/frames.rs
//
// RGBA frame sources for the export pipeline.
//
// ClipReader decodes one video clip sequentially, scaled to a fixed target
// size, and answers "which frame is visible at time t" for monotonically
// increasing t — holding the previous frame when the source frame rate is
// lower than the output rate. No seeking: export always reads clips from
// the start, so the decoder only ever moves forward.
//
// decode_still decodes the single frame of an image source once; the caller
// reuses the returned buffer for the clip's whole duration.
//
// Scalers are built lazily on the first decoded frame so the real input
// pixel format is known before the SwsContext exists.

use std::path::PathBuf;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::{input, Pixel};
use ffmpeg::media::Type as MediaType;
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags};
use ffmpeg::util::frame::video::Video as VideoFrame;

use reelsmith_core::{PipelineError, Result};

// ── ClipReader ────────────────────────────────────────────────────────────────

pub struct ClipReader {
    path:      PathBuf,
    ictx:      ffmpeg::format::context::Input,
    decoder:   ffmpeg::decoder::video::Video,
    video_idx: usize,
    tb_num:    i32,
    tb_den:    i32,
    /// Display dimensions from codec parameters — NOT the decoder's coded
    /// dimensions, which include macroblock padding rows (1920×1088 for a
    /// 1080p clip) that would otherwise leak into the scaled output.
    src_w:     u32,
    src_h:     u32,
    out_w:     u32,
    out_h:     u32,
    scaler:    Option<SwsContext>,
    /// Latest frame whose timestamp is ≤ the last requested t.
    current:   Option<(f64, Vec<u8>)>,
    /// First decoded frame whose timestamp ran ahead of the request.
    pending:   Option<(f64, Vec<u8>)>,
    eof:       bool,
}

impl ClipReader {
    /// Open `path` for sequential reading, scaling every frame to
    /// `out_w × out_h` RGBA.
    pub fn open(path: &PathBuf, out_w: u32, out_h: u32) -> Result<Self> {
        let ictx = input(path)
            .map_err(|e| PipelineError::decode(path, e.to_string()))?;

        let video_idx = ictx
            .streams()
            .best(MediaType::Video)
            .ok_or_else(|| PipelineError::decode(path, "no video stream"))?
            .index();

        let (tb_num, tb_den, src_w, src_h) = {
            let stream = ictx.stream(video_idx).unwrap();
            let tb = stream.time_base();
            let params = stream.parameters();
            (tb.numerator(), tb.denominator(), params.width() as u32, params.height() as u32)
        };

        // Second context for decoder construction (Parameters borrows from ictx).
        let ictx2 = input(path)
            .map_err(|e| PipelineError::decode(path, e.to_string()))?;
        let dec_ctx = ffmpeg::codec::context::Context::from_parameters(
            ictx2.stream(video_idx).unwrap().parameters(),
        ).map_err(|e| PipelineError::decode(path, format!("decoder context: {e}")))?;
        let decoder = dec_ctx.decoder().video()
            .map_err(|e| PipelineError::decode(path, format!("open decoder: {e}")))?;

        Ok(Self {
            path: path.clone(),
            ictx,
            decoder,
            video_idx,
            tb_num,
            tb_den,
            src_w: src_w.max(2),
            src_h: src_h.max(2),
            out_w,
            out_h,
            scaler:  None,
            current: None,
            pending: None,
            eof:     false,
        })
    }

    /// The frame visible at `t` seconds into the clip. `t` must not decrease
    /// between calls. Returns the last decoded frame after EOF, and the first
    /// frame for a `t` before the stream's first timestamp.
    pub fn frame_at(&mut self, t: f64) -> Result<&[u8]> {
        if let Some((pts, _)) = &self.pending {
            if *pts <= t {
                self.current = self.pending.take();
            }
        }
        while self.pending.is_none() && !self.eof {
            match self.decode_next()? {
                Some((pts, data)) => {
                    if pts <= t {
                        self.current = Some((pts, data));
                    } else {
                        self.pending = Some((pts, data));
                    }
                }
                None => self.eof = true,
            }
        }
        self.current
            .as_ref()
            .or(self.pending.as_ref())
            .map(|(_, d)| d.as_slice())
            .ok_or_else(|| PipelineError::decode(&self.path, "no frames decoded"))
    }

    /// Decode and scale the next frame in presentation order.
    fn decode_next(&mut self) -> Result<Option<(f64, Vec<u8>)>> {
        let mut decoded = VideoFrame::empty();

        // Frames may already be buffered in the decoder from a prior packet.
        if self.decoder.receive_frame(&mut decoded).is_ok() {
            return self.scale_out(&decoded).map(Some);
        }

        loop {
            // Pull the next packet belonging to the video stream.
            let packet = {
                let mut next = None;
                for result in self.ictx.packets() {
                    let (stream, packet) = result.map_err(|e| {
                        PipelineError::decode(&self.path, format!("read packet: {e}"))
                    })?;
                    if stream.index() == self.video_idx {
                        next = Some(packet);
                        break;
                    }
                }
                next
            };

            match packet {
                Some(pkt) => {
                    if self.decoder.send_packet(&pkt).is_err() {
                        continue;
                    }
                    if self.decoder.receive_frame(&mut decoded).is_ok() {
                        return self.scale_out(&decoded).map(Some);
                    }
                }
                None => break,
            }
        }

        // Drain the decoder tail (B-frame codecs hold frames internally).
        let _ = self.decoder.send_eof();
        if self.decoder.receive_frame(&mut decoded).is_ok() {
            return self.scale_out(&decoded).map(Some);
        }
        Ok(None)
    }

    /// Scale `decoded` to packed RGBA at the target size, tagged with its
    /// timestamp in seconds.
    fn scale_out(&mut self, decoded: &VideoFrame) -> Result<(f64, Vec<u8>)> {
        let pts_secs = decoded.pts()
            .map(|pts| pts as f64 * self.tb_num as f64 / self.tb_den as f64)
            .unwrap_or(0.0);

        if self.scaler.is_none() {
            let s = SwsContext::get(
                decoded.format(), self.src_w, self.src_h,
                Pixel::RGBA, self.out_w, self.out_h,
                Flags::BILINEAR,
            ).map_err(|e| PipelineError::decode(&self.path, format!("create scaler: {e}")))?;
            self.scaler = Some(s);
        }
        let scaler = self.scaler.as_mut().expect("scaler initialised above");

        let mut out = VideoFrame::empty();
        scaler.run(decoded, &mut out)
            .map_err(|e| PipelineError::decode(&self.path, format!("scale frame: {e}")))?;

        Ok((pts_secs, destride_rgba(&out, self.out_w, self.out_h)))
    }
}

// ── Stills ────────────────────────────────────────────────────────────────────

/// Decode the single frame of an image source and scale it to
/// `out_w × out_h` packed RGBA.
pub fn decode_still(path: &PathBuf, out_w: u32, out_h: u32) -> Result<Vec<u8>> {
    let mut reader = ClipReader::open(path, out_w, out_h)?;
    Ok(reader.frame_at(0.0)?.to_vec())
}

/// Copy the visible RGBA pixels out of a scaled frame, dropping the stride
/// padding ffmpeg may append to each row.
fn destride_rgba(frame: &VideoFrame, w: u32, h: u32) -> Vec<u8> {
    let stride = frame.stride(0);
    let raw = frame.data(0);
    let row_bytes = w as usize * 4;
    (0..h as usize)
        .flat_map(|row| &raw[row * stride..row * stride + row_bytes])
        .copied()
        .collect()
}
