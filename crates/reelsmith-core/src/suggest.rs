// crates/reelsmith-core/src/suggest.rs
//
// Suggestion hooks: a capability that may or may not be backed by a real
// implementation. The pipeline never branches on "is AI on" — it holds a
// trait object and calls it; which implementation sits behind the pointer is
// a configuration decision made once at startup.

use std::path::PathBuf;

/// Export settings a suggestion engine proposes for a set of sources.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportHints {
    pub codec:   String,
    pub bitrate: String,
    pub fps:     u32,
}

impl Default for ExportHints {
    fn default() -> Self {
        Self { codec: "libx264".into(), bitrate: "4000k".into(), fps: 30 }
    }
}

/// Optional assistance around a job: scene ordering, captions, music,
/// export settings. Implementations hold no per-job state.
pub trait SuggestionEngine: Send + Sync {
    fn label(&self) -> &'static str;

    /// Propose an ordering for the scene files. Must return a permutation
    /// of the input — callers feed the result straight into a Job.
    fn order_scenes(&self, files: Vec<PathBuf>) -> Vec<PathBuf>;

    /// Caption suggestions for the given description. Empty when the engine
    /// has nothing to offer.
    fn captions(&self, _description: &str) -> Vec<String> {
        Vec::new()
    }

    /// A background-music suggestion for the given mood and duration.
    fn music(&self, _mood: &str, _duration_secs: f64) -> Option<String> {
        None
    }

    /// Whether crossfades are worth enabling for this many scenes.
    fn use_transitions(&self, scene_count: usize) -> bool {
        scene_count > 1
    }

    /// Export settings suggested for the average source resolution.
    fn export_hints(&self, avg_width: u32, avg_height: u32) -> ExportHints;
}

/// Select the engine by configuration.
pub fn engine(enabled: bool) -> Box<dyn SuggestionEngine> {
    let engine: Box<dyn SuggestionEngine> = if enabled {
        Box::new(Heuristic)
    } else {
        Box::new(Disabled)
    };
    log::debug!("suggestion engine: {}", engine.label());
    engine
}

// ── Disabled: the identity engine ─────────────────────────────────────────────

/// Pass-through engine used when suggestions are off: input order is kept,
/// every hint is the default.
pub struct Disabled;

impl SuggestionEngine for Disabled {
    fn label(&self) -> &'static str {
        "disabled"
    }

    fn order_scenes(&self, files: Vec<PathBuf>) -> Vec<PathBuf> {
        files
    }

    fn export_hints(&self, _avg_width: u32, _avg_height: u32) -> ExportHints {
        ExportHints::default()
    }
}

// ── Heuristic: no inference, just sensible rules ──────────────────────────────

/// Rule-based engine: scenes sorted by file name, bitrate tiered by source
/// resolution. No network, no model.
pub struct Heuristic;

impl SuggestionEngine for Heuristic {
    fn label(&self) -> &'static str {
        "heuristic"
    }

    fn order_scenes(&self, mut files: Vec<PathBuf>) -> Vec<PathBuf> {
        files.sort_by_key(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default()
        });
        files
    }

    fn export_hints(&self, avg_width: u32, avg_height: u32) -> ExportHints {
        let pixels = avg_width as u64 * avg_height as u64;
        let bitrate = if pixels > 1920 * 1080 {
            "8000k"
        } else if pixels < 1280 * 720 {
            "2000k"
        } else {
            "4000k"
        };
        ExportHints { bitrate: bitrate.into(), ..ExportHints::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_keeps_input_order() {
        let files: Vec<PathBuf> = vec!["c.png".into(), "a.png".into(), "b.png".into()];
        assert_eq!(engine(false).order_scenes(files.clone()), files);
    }

    #[test]
    fn heuristic_sorts_by_name() {
        let files: Vec<PathBuf> = vec!["c.png".into(), "A.png".into(), "b.png".into()];
        let ordered = engine(true).order_scenes(files);
        let names: Vec<_> = ordered.iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["A.png", "b.png", "c.png"]);
    }

    #[test]
    fn ordering_is_a_permutation() {
        let files: Vec<PathBuf> = vec!["z".into(), "y".into(), "x".into()];
        let mut ordered = engine(true).order_scenes(files.clone());
        let mut input = files;
        ordered.sort();
        input.sort();
        assert_eq!(ordered, input);
    }

    #[test]
    fn bitrate_tiers_follow_resolution() {
        let h = Heuristic;
        assert_eq!(h.export_hints(3840, 2160).bitrate, "8000k");
        assert_eq!(h.export_hints(1920, 1080).bitrate, "4000k");
        assert_eq!(h.export_hints(640, 360).bitrate, "2000k");
    }

    #[test]
    fn stubs_stay_empty() {
        assert!(engine(true).captions("beach day").is_empty());
        assert!(engine(false).music("calm", 30.0).is_none());
    }
}
