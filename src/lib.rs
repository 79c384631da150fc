//! roadwatch - vehicle detection and running-count pipeline.
//!
//! This crate implements a single-threaded frame processing loop over
//! sequential video frames:
//!
//! ```text
//! VideoSource -> DetectorBackend -> annotate -> FrameSink? -> FrameDisplay
//! ```
//!
//! Each frame is pulled, run through a swappable vehicle detector, stamped
//! with bounding boxes and the cumulative detection count, optionally
//! persisted, and shown. The count is naive and additive: a vehicle visible
//! in ten frames counts ten times. Termination is cooperative (end of
//! stream, mid-stream read failure, or a cancel token checked once per
//! frame), and a run always releases its sink and display exactly once.
//!
//! # Module Structure
//!
//! - `frame`: RGB24 frame container
//! - `source`: frame input (synthetic, video files, capture devices)
//! - `detect`: detector backends and registry
//! - `annotate`: in-place boxes and count overlay
//! - `sink`: optional frame output (JPEG sequence, memory, video)
//! - `display`: optional interactive window
//! - `pipeline`: the loop, cancel token, and running count
//! - `config`: daemon configuration (file + environment)

pub mod annotate;
pub mod config;
pub mod detect;
pub mod display;
pub mod frame;
pub mod pipeline;
pub mod sink;
pub mod source;

pub use config::RoadwatchConfig;
pub use detect::{BackendRegistry, Detection, DetectorBackend, DetectorConfig, ScriptedBackend, StubBackend};
pub use display::{FrameDisplay, HeadlessDisplay};
pub use frame::Frame;
pub use pipeline::{CancelToken, Pipeline, RunSummary, RunningCount, StopReason};
pub use sink::{FrameSink, JpegSequenceSink, MemorySink};
pub use source::{
    FrameRead, SourceConfig, SourceFormat, SourceSpec, SourceUnavailable, VideoSource,
};

#[cfg(feature = "backend-cascade")]
pub use detect::CascadeBackend;
#[cfg(feature = "display-highgui")]
pub use display::HighguiDisplay;
#[cfg(feature = "sink-video")]
pub use sink::VideoWriterSink;
