//! demo - end-to-end synthetic run for roadwatch
//!
//! Runs the full pipeline over a synthetic source with either the stub
//! detector or a scripted per-frame detection plan, writing annotated JPEGs
//! to an output directory. No camera, video file, or optional feature needed.

use anyhow::{anyhow, Result};
use clap::Parser;

use roadwatch::{
    BackendRegistry, JpegSequenceSink, Pipeline, ScriptedBackend, SourceConfig, StubBackend,
    VideoSource,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic frames to process.
    #[arg(long, default_value_t = 50)]
    frames: u64,
    /// Frames per second reported by the synthetic source.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Output directory for annotated frames.
    #[arg(long, default_value = "demo_out")]
    out: String,
    /// Comma-separated per-frame detection counts. Uses the stub detector
    /// when absent.
    #[arg(long)]
    counts: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.fps == 0 {
        return Err(anyhow!("fps must be >= 1"));
    }

    let mut registry = BackendRegistry::new();
    match &args.counts {
        Some(counts) => registry.register(ScriptedBackend::new(parse_counts(counts)?)),
        None => registry.register(StubBackend::new()),
    }
    let detector = registry.select(None)?;

    let source = VideoSource::open(SourceConfig {
        identifier: format!("stub://demo?frames={}", args.frames),
        target_fps: args.fps,
        ..SourceConfig::default()
    })?;

    let sink = JpegSequenceSink::new(&args.out)?;
    let summary = Pipeline::new(source, detector)
        .with_sink(Box::new(sink))
        .run()?;

    println!(
        "processed {} frames, counted {} detections ({:?}); annotated frames in {}",
        summary.frames_processed, summary.total_detections, summary.stop_reason, args.out
    );
    Ok(())
}

fn parse_counts(raw: &str) -> Result<Vec<usize>> {
    raw.split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse()
                .map_err(|_| anyhow!("counts must be integers, got '{}'", entry))
        })
        .collect()
}
