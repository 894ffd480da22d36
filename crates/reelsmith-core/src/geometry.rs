// crates/reelsmith-core/src/geometry.rs
//
// Aspect-ratio normalization math: how one source frame of arbitrary
// dimensions maps into the fixed vertical canvas.
//
// Rounding rule (applied uniformly, everywhere): scaled dimensions round to
// the nearest EVEN integer, ties up. The canvas dimensions are even, so every
// centering offset below is an exact integer — Fit padding is exactly
// symmetric and Crop windows land on whole pixels. Off-by-one drift between
// the two sides of a letterbox is not possible under this rule.

use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;

// ── Fill modes ────────────────────────────────────────────────────────────────

/// How a source that doesn't match the canvas aspect gets normalized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    /// Letterbox: uniform scale to fit, black bars on the unconstrained axis.
    #[default]
    Fit,
    /// Fill: uniform scale to cover, centered window kept, edges lost.
    Crop,
    /// Blurred cover background with a centered Fit layer on top.
    Blur,
}

impl std::str::FromStr for FillMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fit"  => Ok(FillMode::Fit),
            "crop" => Ok(FillMode::Crop),
            "blur" => Ok(FillMode::Blur),
            other  => Err(format!("unknown fill mode '{other}' (expected fit, crop, or blur)")),
        }
    }
}

impl std::fmt::Display for FillMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FillMode::Fit  => "fit",
            FillMode::Crop => "crop",
            FillMode::Blur => "blur",
        })
    }
}

// ── Placement ─────────────────────────────────────────────────────────────────

/// Resolved mapping of one source onto the canvas. All dimensions are final
/// output pixels; the media crate only has to scale to `scaled` and copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// Scale the source uniformly to `scaled` (≤ canvas on both axes) and
    /// center it at `offset` on an opaque black canvas.
    Fit { scaled: (u32, u32), offset: (u32, u32) },
    /// Scale the source uniformly to `scaled` (≥ canvas on both axes) and
    /// keep the canvas-sized window whose top-left is `window`.
    Crop { scaled: (u32, u32), window: (u32, u32) },
    /// Background: source stretched (non-uniformly) to the full canvas and
    /// blurred. Foreground: the Fit layer, `scaled` centered at `offset`.
    Blur { scaled: (u32, u32), offset: (u32, u32) },
}

impl Placement {
    /// Compute the placement for a `src_w × src_h` source under `mode`.
    ///
    /// ```
    /// use reelsmith_core::{Canvas, FillMode, Placement};
    /// let canvas = Canvas::default(); // 1080×1920
    /// // A 1920×1080 landscape clip letterboxed into the vertical canvas:
    /// let p = Placement::compute(FillMode::Fit, 1920, 1080, canvas);
    /// assert_eq!(p, Placement::Fit { scaled: (1080, 608), offset: (0, 656) });
    /// ```
    pub fn compute(mode: FillMode, src_w: u32, src_h: u32, canvas: Canvas) -> Placement {
        debug_assert!(src_w > 0 && src_h > 0, "source dimensions must be positive");
        match mode {
            FillMode::Fit => {
                let scaled = fit_size(src_w, src_h, canvas);
                Placement::Fit { scaled, offset: centered((canvas.width, canvas.height), scaled) }
            }
            FillMode::Crop => {
                let scaled = cover_size(src_w, src_h, canvas);
                Placement::Crop { scaled, window: centered(scaled, (canvas.width, canvas.height)) }
            }
            FillMode::Blur => {
                let scaled = fit_size(src_w, src_h, canvas);
                Placement::Blur { scaled, offset: centered((canvas.width, canvas.height), scaled) }
            }
        }
    }

    /// Dimensions the source must be scaled to before compositing.
    pub fn scaled(&self) -> (u32, u32) {
        match *self {
            Placement::Fit { scaled, .. }
            | Placement::Crop { scaled, .. }
            | Placement::Blur { scaled, .. } => scaled,
        }
    }

    /// True when the placement fills the canvas exactly — no bars, no window
    /// offset, no visible blur border. Holds for all three modes whenever the
    /// source aspect equals the canvas aspect.
    pub fn is_degenerate(&self, canvas: Canvas) -> bool {
        self.scaled() == (canvas.width, canvas.height)
    }
}

// ── Sizing ────────────────────────────────────────────────────────────────────

/// Round to the nearest even integer, ties up. Never below 2.
fn round_even(x: f64) -> u32 {
    (((x / 2.0).round() as u32) * 2).max(2)
}

/// Uniform-scale dimensions that fit inside the canvas, touching it on the
/// constrained axis (width when the source is wider than the canvas ratio,
/// height otherwise).
pub fn fit_size(src_w: u32, src_h: u32, canvas: Canvas) -> (u32, u32) {
    let src_aspect = src_w as f64 / src_h as f64;
    if src_aspect > canvas.aspect() {
        let h = round_even(canvas.width as f64 / src_aspect).min(canvas.height);
        (canvas.width, h)
    } else {
        let w = round_even(canvas.height as f64 * src_aspect).min(canvas.width);
        (w, canvas.height)
    }
}

/// Uniform-scale dimensions that cover the canvas completely; the mirror of
/// `fit_size` (constrained axis swapped, rounding clamped upward).
pub fn cover_size(src_w: u32, src_h: u32, canvas: Canvas) -> (u32, u32) {
    let src_aspect = src_w as f64 / src_h as f64;
    if src_aspect > canvas.aspect() {
        let w = round_even(canvas.height as f64 * src_aspect).max(canvas.width);
        (w, canvas.height)
    } else {
        let h = round_even(canvas.width as f64 / src_aspect).max(canvas.height);
        (canvas.width, h)
    }
}

/// Top-left offset that centers `inner` inside `outer`. Both extents are
/// even under the rounding rule, so the division is exact.
fn centered(outer: (u32, u32), inner: (u32, u32)) -> (u32, u32) {
    debug_assert!(inner.0 <= outer.0 && inner.1 <= outer.1);
    ((outer.0 - inner.0) / 2, (outer.1 - inner.1) / 2)
}

// ── Source-space crop region ──────────────────────────────────────────────────

/// Axis-aligned pixel rectangle in source coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// The largest centered region of a `src_w × src_h` source whose aspect
/// equals the canvas aspect — what Crop mode keeps, expressed in source
/// pixels. The pipeline itself works in scaled space (`cover_size` + window),
/// which is the same mapping; this form exists so the containment contract
/// can be checked against the source directly.
pub fn crop_region(src_w: u32, src_h: u32, canvas: Canvas) -> Rect {
    let src_aspect = src_w as f64 / src_h as f64;
    if src_aspect > canvas.aspect() {
        let w = round_even(src_h as f64 * canvas.aspect()).min(src_w);
        Rect { x: (src_w - w) / 2, y: 0, w, h: src_h }
    } else {
        let h = round_even(src_w as f64 / canvas.aspect()).min(src_h);
        Rect { x: 0, y: (src_h - h) / 2, w: src_w, h }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> Canvas {
        Canvas::default()
    }

    // ── Fit ───────────────────────────────────────────────────────────────────

    #[test]
    fn fit_landscape_letterboxes_vertically() {
        // 16:9 source into 9:16 canvas: width-constrained.
        let p = Placement::compute(FillMode::Fit, 1920, 1080, canvas());
        let Placement::Fit { scaled, offset } = p else { panic!() };
        assert_eq!(scaled.0, 1080);
        assert!(scaled.1 < 1920);
        // Symmetric padding: offsets recover the exact leftover on each side.
        assert_eq!(offset.1 * 2 + scaled.1, 1920);
        assert_eq!(offset.0, 0);
    }

    #[test]
    fn fit_tall_source_pillarboxes_horizontally() {
        // 1:2 source is taller than 9:16 → height-constrained, bars left/right.
        let p = Placement::compute(FillMode::Fit, 500, 1000, canvas());
        let Placement::Fit { scaled, offset } = p else { panic!() };
        assert_eq!(scaled.1, 1920);
        assert!(scaled.0 < 1080);
        assert_eq!(offset.0 * 2 + scaled.0, 1080);
    }

    #[test]
    fn fit_never_exceeds_canvas() {
        for (w, h) in [(1, 10_000), (10_000, 1), (641, 479), (1080, 1920), (3, 7)] {
            let (sw, sh) = fit_size(w, h, canvas());
            assert!(sw <= 1080 && sh <= 1920, "fit {w}x{h} → {sw}x{sh}");
            assert!(sw % 2 == 0 && sh % 2 == 0);
        }
    }

    #[test]
    fn fit_preserves_aspect_within_rounding() {
        let (sw, sh) = fit_size(1920, 1080, canvas());
        let src = 1920.0 / 1080.0;
        let out = sw as f64 / sh as f64;
        // One even-rounding step on a ~1080px extent.
        assert!((out - src).abs() / src < 0.01, "aspect drifted: {src} → {out}");
    }

    // ── Crop ──────────────────────────────────────────────────────────────────

    #[test]
    fn crop_covers_and_centers_window() {
        let p = Placement::compute(FillMode::Crop, 1920, 1080, canvas());
        let Placement::Crop { scaled, window } = p else { panic!() };
        assert!(scaled.0 >= 1080 && scaled.1 >= 1920);
        assert_eq!(window.0 * 2 + 1080, scaled.0);
        assert_eq!(window.1, 0);
    }

    #[test]
    fn crop_region_matches_canvas_ratio() {
        for (w, h) in [(1920, 1080), (1080, 1921), (640, 480), (799, 1333)] {
            let r = crop_region(w, h, canvas());
            let ratio = r.w as f64 / r.h as f64;
            // Within one even-rounding step of 9:16.
            let step = 2.0 / r.h.min(r.w) as f64;
            assert!(
                (ratio - canvas().aspect()).abs() <= canvas().aspect() * step * 2.0 + 1e-9,
                "{w}x{h}: region {r:?} ratio {ratio}"
            );
            assert!(r.x + r.w <= w && r.y + r.h <= h);
        }
    }

    #[test]
    fn crop_region_center_coincides_with_source_center() {
        let r = crop_region(1921, 1080, canvas());
        let region_cx = r.x as f64 + r.w as f64 / 2.0;
        // Floor-centered offset keeps the window within half a pixel of true center.
        assert!((region_cx - 1921.0 / 2.0).abs() <= 0.5);
    }

    // ── Blur ──────────────────────────────────────────────────────────────────

    #[test]
    fn blur_foreground_uses_fit_sizing() {
        let fit  = Placement::compute(FillMode::Fit, 1280, 720, canvas());
        let blur = Placement::compute(FillMode::Blur, 1280, 720, canvas());
        let Placement::Fit  { scaled: fs, offset: fo } = fit  else { panic!() };
        let Placement::Blur { scaled: bs, offset: bo } = blur else { panic!() };
        assert_eq!(fs, bs);
        assert_eq!(fo, bo);
    }

    // ── Degenerate equal-aspect case ──────────────────────────────────────────

    #[test]
    fn equal_aspect_degenerates_for_all_modes() {
        // 540×960 is exactly 9:16.
        for mode in [FillMode::Fit, FillMode::Crop, FillMode::Blur] {
            let p = Placement::compute(mode, 540, 960, canvas());
            assert!(p.is_degenerate(canvas()), "{mode} not degenerate: {p:?}");
            match p {
                Placement::Fit { offset, .. } | Placement::Blur { offset, .. } => {
                    assert_eq!(offset, (0, 0));
                }
                Placement::Crop { window, .. } => assert_eq!(window, (0, 0)),
            }
        }
    }

    // ── Rounding rule ─────────────────────────────────────────────────────────

    #[test]
    fn round_even_nearest_ties_up() {
        assert_eq!(round_even(607.4), 608);
        assert_eq!(round_even(607.0), 608); // 303.5 rounds up
        assert_eq!(round_even(606.9), 606);
        assert_eq!(round_even(0.3), 2);     // floor of 2
    }

    #[test]
    fn fill_mode_round_trips_through_str() {
        for mode in [FillMode::Fit, FillMode::Crop, FillMode::Blur] {
            let parsed: FillMode = mode.to_string().parse().unwrap();
            assert_eq!(parsed, mode);
        }
        assert!("stretch".parse::<FillMode>().is_err());
    }
}
