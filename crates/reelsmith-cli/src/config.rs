// crates/reelsmith-cli/src/config.rs
//
// Runtime configuration resolved once at startup: where output lands, how
// many workers a batch gets by default, and whether the suggestion engine
// is the heuristic one or the pass-through.

use std::path::PathBuf;

use reelsmith_media::DEFAULT_WORKERS;

#[derive(Clone, Debug)]
pub struct Config {
    pub output_dir:  PathBuf,
    pub workers:     usize,
    /// Selects the suggestion engine: heuristic when set, pass-through
    /// otherwise.
    pub suggestions: bool,
}

impl Config {
    /// Environment-driven configuration with documented defaults:
    /// `REELSMITH_OUTPUT_DIR` (default `./output`) and `REELSMITH_SUGGEST`
    /// (truthy values switch the heuristic engine on).
    pub fn from_env() -> Self {
        let output_dir = std::env::var_os("REELSMITH_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("output"));
        let suggestions = std::env::var("REELSMITH_SUGGEST")
            .map(|v| truthy(&v))
            .unwrap_or(false);
        Self { output_dir, workers: DEFAULT_WORKERS, suggestions }
    }
}

fn truthy(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Quality preset → bitrate, for `--quality` shorthand.
pub fn preset_bitrate(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "high"   => Some("8000k"),
        "medium" => Some("4000k"),
        "low"    => Some("2000k"),
        _        => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_cover_the_three_tiers() {
        assert_eq!(preset_bitrate("High"), Some("8000k"));
        assert_eq!(preset_bitrate("medium"), Some("4000k"));
        assert_eq!(preset_bitrate("LOW"), Some("2000k"));
        assert_eq!(preset_bitrate("ultra"), None);
    }

    #[test]
    fn truthy_values() {
        assert!(truthy("1") && truthy("TRUE") && truthy("yes"));
        assert!(!truthy("0") && !truthy("") && !truthy("off"));
    }
}
