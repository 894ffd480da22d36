// crates/reelsmith-core/src/error.rs
//
// Error taxonomy for the whole pipeline. Every failure a job can hit maps to
// one of these four shapes; the batch runner converts any of them (plus
// panics) into a Failed JobResult at the job boundary — nothing propagates
// across jobs.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A job was submitted with no source files at all.
    #[error("no source files supplied")]
    EmptyInput,

    /// The job record is malformed: a path whose kind contradicts the job's
    /// source kind, an unparseable bitrate, a duplicate output path, etc.
    /// Detected before any media is touched.
    #[error("invalid job: {0}")]
    Validation(String),

    /// A source item could not be opened or decoded. Always names the path —
    /// the normalizer never substitutes a blank frame.
    #[error("cannot decode '{}': {reason}", path.display())]
    MediaDecode { path: PathBuf, reason: String },

    /// The encoder failed after normalization succeeded (unknown codec,
    /// disk full, muxer error, …). Carries the underlying message.
    #[error("export failed: {0}")]
    Export(String),
}

impl PipelineError {
    /// Shorthand for decode failures, which are built all over the media crate.
    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::MediaDecode { path: path.into(), reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_names_the_path() {
        let e = PipelineError::decode("/media/a.mp4", "no video stream");
        assert_eq!(
            e.to_string(),
            "cannot decode '/media/a.mp4': no video stream"
        );
    }

    #[test]
    fn empty_input_message() {
        assert_eq!(PipelineError::EmptyInput.to_string(), "no source files supplied");
    }
}
