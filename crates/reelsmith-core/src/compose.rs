// crates/reelsmith-core/src/compose.rs
//
// RGBA raster operations the export pipeline applies once the scaler has
// produced a frame at its placement size. Everything here is pure byte-level
// work on packed RGBA8 buffers (no stride padding — rows are exactly
// width × 4 bytes, the same packed convention the media crate de-strides
// scaler output into).
//
// The crossfade blend runs in gamma-encoded byte space — a correct
// approximation for SDR content, same trade-off the blur makes.

use rayon::prelude::*;

use crate::canvas::Canvas;
use crate::geometry::Placement;

/// Blur radius for the Blur fill mode's background layer, in pixels.
pub const BLUR_RADIUS: u32 = 15;

/// Box-blur passes. Three passes of a box filter approximate a Gaussian
/// closely enough that the background reads as smoothly defocused.
pub const BLUR_PASSES: u32 = 3;

// ── Frame ─────────────────────────────────────────────────────────────────────

/// A packed RGBA8 raster. `data.len() == width * height * 4`, always.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width:  u32,
    pub height: u32,
    pub data:   Vec<u8>,
}

impl Frame {
    /// Opaque black frame — the letterbox background.
    pub fn black(width: u32, height: u32) -> Self {
        let mut data = vec![0u8; width as usize * height as usize * 4];
        // Alpha channel opaque.
        for px in data.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self { width, height, data }
    }

    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 4,
            "RGBA buffer length does not match {width}×{height}");
        Self { width, height, data }
    }
}

// ── Composition entry point ───────────────────────────────────────────────────

/// Composite one scaled source frame onto the canvas per its placement.
///
/// `scaled` must have the placement's scaled dimensions. For `Blur`,
/// `stretched` must be the source stretched (non-uniformly) to the full
/// canvas; it is blurred here and the scaled layer is centered over it.
/// In the degenerate equal-aspect case every mode reduces to the scaled
/// frame itself — no bars, no window, no blurred border.
pub fn compose(placement: &Placement, scaled: &Frame, stretched: Option<&Frame>, canvas: Canvas) -> Frame {
    debug_assert_eq!((scaled.width, scaled.height), placement.scaled());

    if placement.is_degenerate(canvas) {
        return scaled.clone();
    }

    match *placement {
        Placement::Fit { offset, .. } => {
            let mut out = Frame::black(canvas.width, canvas.height);
            overlay(&mut out, scaled, offset);
            out
        }
        Placement::Crop { window, .. } => copy_window(scaled, window, canvas),
        Placement::Blur { offset, .. } => {
            let bg = stretched.expect("Blur placement requires the canvas-stretched background");
            debug_assert_eq!((bg.width, bg.height), (canvas.width, canvas.height));
            let mut out = bg.clone();
            box_blur(&mut out, BLUR_RADIUS, BLUR_PASSES);
            overlay(&mut out, scaled, offset);
            out
        }
    }
}

/// Copy `src` into `dst` with its top-left at `offset`. `src` must fit.
pub fn overlay(dst: &mut Frame, src: &Frame, offset: (u32, u32)) {
    debug_assert!(offset.0 + src.width <= dst.width && offset.1 + src.height <= dst.height);
    let dw = dst.width as usize;
    let sw = src.width as usize;
    let (ox, oy) = (offset.0 as usize, offset.1 as usize);
    for row in 0..src.height as usize {
        let d = ((oy + row) * dw + ox) * 4;
        let s = row * sw * 4;
        dst.data[d..d + sw * 4].copy_from_slice(&src.data[s..s + sw * 4]);
    }
}

/// Extract the canvas-sized window of `src` whose top-left is `window`.
fn copy_window(src: &Frame, window: (u32, u32), canvas: Canvas) -> Frame {
    debug_assert!(window.0 + canvas.width <= src.width && window.1 + canvas.height <= src.height);
    let sw = src.width as usize;
    let cw = canvas.width as usize;
    let (wx, wy) = (window.0 as usize, window.1 as usize);
    let mut data = Vec::with_capacity(canvas.rgba_len());
    for row in 0..canvas.height as usize {
        let s = ((wy + row) * sw + wx) * 4;
        data.extend_from_slice(&src.data[s..s + cw * 4]);
    }
    Frame::from_rgba(canvas.width, canvas.height, data)
}

// ── Box blur ──────────────────────────────────────────────────────────────────

/// Separable box blur with clamp-to-edge sampling, `passes` iterations of
/// horizontal + vertical. Radius is in pixels on each side of the window.
pub fn box_blur(frame: &mut Frame, radius: u32, passes: u32) {
    if radius == 0 || frame.width == 0 || frame.height == 0 {
        return;
    }
    for _ in 0..passes {
        blur_rows(frame, radius);
        transpose(frame);
        blur_rows(frame, radius);
        transpose(frame);
    }
}

/// One horizontal sliding-window pass over every row, all channels.
fn blur_rows(frame: &mut Frame, radius: u32) {
    let w = frame.width as usize;
    if w <= 1 {
        return;
    }
    let r = radius as isize;
    let win = (2 * radius + 1) as u32;

    frame.data.par_chunks_mut(w * 4).for_each(|row| {
        let src = row.to_vec();
        let clamp = |i: isize| i.clamp(0, w as isize - 1) as usize;
        for c in 0..4 {
            let mut sum: u32 = 0;
            for i in -r..=r {
                sum += src[clamp(i) * 4 + c] as u32;
            }
            for x in 0..w {
                row[x * 4 + c] = (sum / win) as u8;
                sum += src[clamp(x as isize + r + 1) * 4 + c] as u32;
                sum -= src[clamp(x as isize - r) * 4 + c] as u32;
            }
        }
    });
}

/// Swap rows and columns (and the width/height fields with them).
fn transpose(frame: &mut Frame) {
    let (w, h) = (frame.width as usize, frame.height as usize);
    let mut out = vec![0u8; frame.data.len()];
    for y in 0..h {
        for x in 0..w {
            let s = (y * w + x) * 4;
            let d = (x * h + y) * 4;
            out[d..d + 4].copy_from_slice(&frame.data[s..s + 4]);
        }
    }
    frame.data = out;
    std::mem::swap(&mut frame.width, &mut frame.height);
}

// ── Crossfade blend ───────────────────────────────────────────────────────────

/// Clamp `t` to [0.0, 1.0].
#[inline]
pub fn clamp01(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Smooth-step ease-in/out. Zero derivative at both endpoints, so a dissolve
/// has no visible pop when it starts or ends.
#[inline]
pub fn ease_in_out(t: f32) -> f32 {
    let t = clamp01(t);
    t * t * (3.0 - 2.0 * t)
}

/// Blend alpha for overlap frame `i` of `n` total blended frames, in the
/// exclusive range (0.0, 1.0) — the pure-A and pure-B frames belong to the
/// clip bodies on either side of the overlap.
#[inline]
pub fn frame_alpha(i: usize, n: usize) -> f32 {
    (i + 1) as f32 / (n + 1) as f32
}

/// Linear blend of two equal-size packed RGBA buffers at `alpha`
/// (0.0 → all `a`, 1.0 → all `b`), in gamma-encoded byte space.
pub fn blend_rgba(a: &[u8], b: &[u8], alpha: f32) -> Vec<u8> {
    debug_assert_eq!(a.len(), b.len(), "blend_rgba: buffer size mismatch");
    let inv = 1.0 - alpha;
    a.iter()
        .zip(b.iter())
        .map(|(&a, &b)| (inv * a as f32 + alpha * b as f32).round() as u8)
        .collect()
}
