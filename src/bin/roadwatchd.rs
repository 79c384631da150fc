//! roadwatchd - vehicle detection daemon
//!
//! This daemon:
//! 1. Opens the configured video source (file, device, or synthetic)
//! 2. Runs the configured detector backend over each frame
//! 3. Annotates frames with bounding boxes and the running count
//! 4. Optionally persists annotated frames and/or shows them in a window
//! 5. Stops on end of stream, read failure, ctrl-c, or the stop key
//!
//! Exit codes: 0 for a clean stop, 2 when the source cannot be opened,
//! 1 for any other error.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

use roadwatch::sink::FrameSink;
use roadwatch::source::SourceFormat;
use roadwatch::{
    BackendRegistry, JpegSequenceSink, Pipeline, RoadwatchConfig, RunSummary, SourceUnavailable,
    StopReason, StubBackend, VideoSource,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video source identifier: file path, device index, or stub:// URI.
    #[arg(long)]
    source: Option<String>,
    /// Write annotated frames to this path (directory for JPEG sequences).
    #[arg(long)]
    output: Option<PathBuf>,
    /// Detector backend name.
    #[arg(long)]
    backend: Option<String>,
    /// Pretrained detector model artifact (cascade XML).
    #[arg(long)]
    model: Option<PathBuf>,
    /// Run without a display window.
    #[arg(long)]
    headless: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(summary) => {
            if summary.stop_reason == StopReason::ReadFailure {
                log::error!("source failed mid-stream after {} frames", summary.frames_processed);
            }
        }
        Err(err) => {
            log::error!("{:#}", err);
            let code = if err.root_cause().downcast_ref::<SourceUnavailable>().is_some() {
                2
            } else {
                1
            };
            std::process::exit(code);
        }
    }
}

fn run() -> Result<RunSummary> {
    let args = Args::parse();
    let mut cfg = RoadwatchConfig::load()?;
    if let Some(source) = args.source {
        cfg.source.identifier = source;
    }
    if let Some(output) = args.output {
        cfg.output_path = Some(output);
    }
    if let Some(backend) = args.backend {
        cfg.detector_backend = backend;
    }
    if let Some(model) = args.model {
        cfg.detector.model_path = Some(model);
    }
    if args.headless {
        cfg.display_enabled = false;
    }

    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new());
    #[cfg(feature = "backend-cascade")]
    if cfg.detector_backend == "cascade" {
        registry.register(roadwatch::CascadeBackend::new(cfg.detector.clone())?);
    }
    let detector = registry.select(Some(&cfg.detector_backend))?;

    let source = VideoSource::open(cfg.source.clone())?;
    let format = source.format();
    log::info!(
        "roadwatchd running: source={} {}x{}@{}fps backend={}",
        source.identifier(),
        format.width,
        format.height,
        format.fps,
        cfg.detector_backend
    );

    let mut pipeline = Pipeline::new(source, detector);
    if let Some(path) = &cfg.output_path {
        pipeline = pipeline.with_sink(open_sink(path, format)?);
        log::info!("writing annotated frames to {}", path.display());
    }
    pipeline = attach_display(pipeline, cfg.display_enabled)?;

    let cancel = pipeline.cancel_token();
    ctrlc::set_handler(move || {
        log::info!("ctrl-c received, finishing current frame");
        cancel.cancel();
    })?;

    pipeline.run()
}

fn open_sink(path: &Path, format: SourceFormat) -> Result<Box<dyn FrameSink>> {
    #[cfg(feature = "sink-video")]
    {
        let is_container = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("avi") | Some("mkv") | Some("mp4")
        );
        if is_container {
            return Ok(Box::new(roadwatch::VideoWriterSink::new(path, format)?));
        }
    }
    #[cfg(not(feature = "sink-video"))]
    let _ = format;
    Ok(Box::new(JpegSequenceSink::new(path)?))
}

#[cfg(feature = "display-highgui")]
fn attach_display(pipeline: Pipeline, display_enabled: bool) -> Result<Pipeline> {
    if !display_enabled {
        return Ok(pipeline);
    }
    match roadwatch::HighguiDisplay::new("roadwatch") {
        Ok(display) => Ok(pipeline.with_display(Box::new(display))),
        Err(err) => {
            log::warn!("failed to open display window: {:#}. Running headless.", err);
            Ok(pipeline)
        }
    }
}

#[cfg(not(feature = "display-highgui"))]
fn attach_display(pipeline: Pipeline, display_enabled: bool) -> Result<Pipeline> {
    if display_enabled {
        log::debug!("no display feature compiled in, running headless");
    }
    Ok(pipeline)
}
