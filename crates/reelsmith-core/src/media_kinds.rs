// crates/reelsmith-core/src/media_kinds.rs
//
// Extension-based media classification. Pure and total: an extension that
// matches none of the three sets is Unknown, never an error. Content
// sniffing is explicitly out of scope — the decoder is the authority on
// whether a file is actually readable.

use std::path::Path;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "ogg", "m4a"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Unknown,
}

/// Classify `path` by its extension, case-insensitively.
///
/// ```
/// use reelsmith_core::media_kinds::{classify, MediaKind};
/// assert_eq!(classify("clip.MP4".as_ref()), MediaKind::Video);
/// assert_eq!(classify("cover.jpeg".as_ref()), MediaKind::Image);
/// assert_eq!(classify("notes.txt".as_ref()), MediaKind::Unknown);
/// ```
pub fn classify(path: &Path) -> MediaKind {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return MediaKind::Unknown;
    };
    let matches = |set: &[&str]| set.iter().any(|s| s.eq_ignore_ascii_case(ext));

    if matches(IMAGE_EXTENSIONS) {
        MediaKind::Image
    } else if matches(VIDEO_EXTENSIONS) {
        MediaKind::Video
    } else if matches(AUDIO_EXTENSIONS) {
        MediaKind::Audio
    } else {
        MediaKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn classifies_each_set() {
        assert_eq!(classify(Path::new("a.png")), MediaKind::Image);
        assert_eq!(classify(Path::new("b.mkv")), MediaKind::Video);
        assert_eq!(classify(Path::new("c.m4a")), MediaKind::Audio);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(classify(Path::new("SHOUTY.WEBP")), MediaKind::Image);
        assert_eq!(classify(Path::new("Clip.MoV")), MediaKind::Video);
    }

    #[test]
    fn unknown_for_missing_or_foreign_extension() {
        assert_eq!(classify(Path::new("no_extension")), MediaKind::Unknown);
        assert_eq!(classify(Path::new("archive.tar.gz")), MediaKind::Unknown);
        assert_eq!(classify(Path::new(".hidden")), MediaKind::Unknown);
    }

    #[test]
    fn sets_are_disjoint() {
        for i in IMAGE_EXTENSIONS {
            assert!(!VIDEO_EXTENSIONS.contains(i) && !AUDIO_EXTENSIONS.contains(i));
        }
        for v in VIDEO_EXTENSIONS {
            assert!(!AUDIO_EXTENSIONS.contains(v));
        }
    }
}
