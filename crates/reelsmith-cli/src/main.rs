// crates/reelsmith-cli/src/main.rs
//
// The reelsmith command line: two single-video subcommands and a batch
// subcommand reading a JSON description file. Exit code 0 iff every task in
// the invocation succeeded.

mod batch_file;
mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::unbounded;
use indicatif::{ProgressBar, ProgressStyle};

use reelsmith_core::media_kinds::{classify, MediaKind};
use reelsmith_core::sanitize::sanitize_filename;
use reelsmith_core::suggest;
use reelsmith_core::{Canvas, FillMode, Job, JobResult, SourceKind};
use reelsmith_media::{
    assemble_timeline, export_timeline, extension_for_codec, BatchProgress, BatchRunner,
    ExportProgress, ExportSettings, DEFAULT_WORKERS,
};

use crate::batch_file::load_batch_file;
use crate::config::{preset_bitrate, Config};

#[derive(Parser)]
#[command(name = "reelsmith")]
#[command(about = "Assemble vertical 9:16 videos from images or clips")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Encoder options shared by the single-video subcommands.
#[derive(Args, Clone)]
struct EncodeArgs {
    /// Output name (extension is derived from the codec)
    #[arg(short, long)]
    output: String,
    /// Optional background audio track (looped or truncated to fit)
    #[arg(long)]
    audio: Option<PathBuf>,
    /// Video codec: libx264, libx265, libvpx-vp9, mpeg4
    #[arg(long, default_value = "libx264")]
    codec: String,
    /// Video bitrate, e.g. 4000k
    #[arg(long, default_value = "4000k")]
    bitrate: String,
    /// Quality preset overriding --bitrate: high, medium, low
    #[arg(long)]
    quality: Option<String>,
    /// Output frame rate
    #[arg(long, default_value_t = 30)]
    fps: u32,
}

impl EncodeArgs {
    fn resolve_bitrate(&self) -> anyhow::Result<String> {
        match &self.quality {
            Some(q) => preset_bitrate(q)
                .map(String::from)
                .ok_or_else(|| anyhow::anyhow!("unknown quality preset '{q}' (high, medium, low)")),
            None => Ok(self.bitrate.clone()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build one video from still images
    FromImages {
        /// Image files, or directories to scan for them
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[command(flatten)]
        encode: EncodeArgs,
        /// Seconds each image is shown
        #[arg(long, default_value_t = 3.0)]
        duration: f64,
        /// Disable crossfade transitions between images
        #[arg(long)]
        no_transitions: bool,
        /// Let the suggestion engine order the scenes
        #[arg(long)]
        auto_order: bool,
    },
    /// Build one vertical video from existing clips
    FromVideos {
        /// Video files, or directories to scan for them
        #[arg(required = true)]
        videos: Vec<PathBuf>,
        #[command(flatten)]
        encode: EncodeArgs,
        /// Aspect handling: fit, crop, or blur
        #[arg(long, default_value = "fit")]
        fill: String,
    },
    /// Run every task in a JSON batch description file
    Batch {
        /// Path to the batch description file
        file: PathBuf,
        /// Concurrently running jobs
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = Config::from_env();

    match run(cli, &config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\n✗ Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: &Config) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::FromImages { images, encode, duration, no_transitions, auto_order } => {
            let mut files = expand_sources(&images, MediaKind::Image)?;
            if auto_order || config.suggestions {
                files = suggest::engine(true).order_scenes(files);
            }

            let mut job = Job::new(SourceKind::Images, files, encode.output.clone());
            job.audio_file = encode.audio.clone();
            job.duration_per_item = duration;
            job.use_transitions = !no_transitions;
            job.codec = encode.codec.clone();
            job.bitrate = encode.resolve_bitrate()?;
            job.fps = encode.fps;

            run_single(&job, config)
        }
        Commands::FromVideos { videos, encode, fill } => {
            let files = expand_sources(&videos, MediaKind::Video)?;
            let fill_mode: FillMode = fill.parse().map_err(|e: String| anyhow::anyhow!(e))?;

            let mut job = Job::new(SourceKind::Videos, files, encode.output.clone());
            job.audio_file = encode.audio.clone();
            job.fill_mode = fill_mode;
            job.codec = encode.codec.clone();
            job.bitrate = encode.resolve_bitrate()?;
            job.fps = encode.fps;

            run_single(&job, config)
        }
        Commands::Batch { file, workers } => run_batch(&file, workers, config),
    }
}

// ── Single-video path ─────────────────────────────────────────────────────────

fn run_single(job: &Job, config: &Config) -> anyhow::Result<ExitCode> {
    let name = sanitize_filename(&job.output_name);
    if name.is_empty() {
        bail!("output name is empty after sanitization");
    }
    let output = config
        .output_dir
        .join(format!("{name}{}", extension_for_codec(&job.codec)));

    let timeline = assemble_timeline(job, Canvas::default())?;
    let settings = ExportSettings::from_job(job);

    // The exporter blocks this thread; a side thread drives the bar from
    // its progress events.
    let (tx, rx) = unbounded::<ExportProgress>();
    let bar_thread = std::thread::spawn(move || {
        let bar = ProgressBar::new(1).with_style(
            ProgressStyle::with_template("{bar:32} {pos}/{len} frames  {elapsed}")
                .expect("static progress template"),
        );
        for event in rx {
            bar.set_length(event.total_frames);
            bar.set_position(event.frame);
        }
        bar.finish_and_clear();
    });

    let result = export_timeline(timeline, &output, &settings, Some(&tx));
    drop(tx);
    let _ = bar_thread.join();

    result?;
    println!("\n✓ Video created successfully: {}", output.display());
    Ok(ExitCode::SUCCESS)
}

// ── Batch path ────────────────────────────────────────────────────────────────

fn run_batch(file: &Path, workers: usize, config: &Config) -> anyhow::Result<ExitCode> {
    let jobs = load_batch_file(file)?;
    if jobs.is_empty() {
        bail!("batch file '{}' contains no tasks", file.display());
    }
    let total = jobs.len();
    println!("Processing {total} task(s) with {workers} worker(s)…\n");

    let (tx, rx) = unbounded::<BatchProgress>();
    let printer = std::thread::spawn(move || {
        for event in rx {
            let r = &event.result;
            let icon = if r.is_success() { "✓" } else { "✗" };
            println!(
                "{icon} [{}/{}] task {}: {}",
                event.completed,
                event.total,
                r.task_id + 1,
                if r.is_success() { "success" } else { "failed" },
            );
        }
    });

    let runner = BatchRunner::new(config.output_dir.clone()).with_workers(workers);
    let mut results = runner.run(jobs, Some(tx));
    let _ = printer.join();

    results.sort_by_key(|r| r.task_id);
    print_summary(&results);

    let all_ok = results.iter().all(JobResult::is_success);
    Ok(if all_ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn print_summary(results: &[JobResult]) {
    println!("\nBatch results:");
    println!("{}", "-".repeat(60));
    for r in results {
        let icon = if r.is_success() { "✓" } else { "✗" };
        println!("{icon} Task {}: {}", r.task_id + 1, if r.is_success() { "success" } else { "failed" });
        if let Some(path) = &r.output_path {
            println!("   Output: {}", path.display());
        }
        if let Some(error) = &r.error {
            println!("   Error: {error}");
        }
    }
    println!("{}", "-".repeat(60));
    let ok = results.iter().filter(|r| r.is_success()).count();
    println!("Completed: {ok}/{} successful", results.len());
}

// ── Source expansion ──────────────────────────────────────────────────────────

/// Expand any directories among `inputs` to their contained files of `kind`,
/// sorted by name; plain files pass through unchanged.
fn expand_sources(inputs: &[PathBuf], kind: MediaKind) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("scan directory '{}'", input.display()))?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && classify(p) == kind)
                .collect();
            found.sort();
            if found.is_empty() {
                bail!("directory '{}' contains no {kind:?} files", input.display());
            }
            out.extend(found);
        } else {
            out.push(input.clone());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_keeps_plain_files_in_order() {
        let inputs = vec![PathBuf::from("b.png"), PathBuf::from("a.png")];
        let out = expand_sources(&inputs, MediaKind::Image).unwrap();
        assert_eq!(out, inputs);
    }

    #[test]
    fn expand_scans_directories_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.png", "a.jpg", "skip.txt", "b.webp"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let out = expand_sources(&[dir.path().to_path_buf()], MediaKind::Image).unwrap();
        let names: Vec<_> = out.iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a.jpg", "b.webp", "c.png"]);
    }

    #[test]
    fn expand_rejects_directories_without_matches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        assert!(expand_sources(&[dir.path().to_path_buf()], MediaKind::Video).is_err());
    }
}
