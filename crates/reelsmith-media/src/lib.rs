// crates/reelsmith-media/src/lib.rs
//
// The ffmpeg side of reelsmith: probing, frame decoding, timeline assembly,
// encoding, and the concurrent batch runner. No CLI concerns — the binary
// crate talks to this through plain data and channels.
//
// To add a new media capability:
//   1. Create a module file here
//   2. Add `pub mod mymodule;` below
//   3. Wire it into assemble.rs or export.rs

pub mod assemble;
pub mod audio;
pub mod batch;
pub mod export;
pub mod frames;
pub mod probe;

// Re-export the main public API so callers get shallow import paths.
pub use assemble::assemble_timeline;
pub use batch::{BatchProgress, BatchRunner, DEFAULT_WORKERS, MAX_BATCH_SIZE};
pub use export::{export_timeline, extension_for_codec, ExportProgress, ExportSettings};
pub use probe::MediaInfo;
