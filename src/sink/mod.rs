//! Frame sinks.
//!
//! A sink is an optional, write-only consumer of annotated frames:
//! - `JpegSequenceSink`: numbered JPEG files in a directory
//! - `MemorySink`: in-memory recording (testing)
//! - `VideoWriterSink`: video container output (feature: sink-video)
//!
//! Sinks receive frames in source order. A failed write must not abort the
//! pipeline; the loop logs the failure and continues, since losing the output
//! artifact should not stop detection or display.

mod jpeg_seq;
mod memory;

#[cfg(feature = "sink-video")]
mod video_writer;

pub use jpeg_seq::JpegSequenceSink;
pub use memory::MemorySink;

#[cfg(feature = "sink-video")]
pub use video_writer::VideoWriterSink;

use anyhow::Result;

use crate::frame::Frame;

/// Write-only frame consumer.
pub trait FrameSink: Send {
    /// Persist one annotated frame. Frames arrive in source order.
    fn write(&mut self, frame: &Frame) -> Result<()>;

    /// Flush buffered output and release the sink.
    ///
    /// Called exactly once per pipeline run, on every exit path. Writing
    /// after `finish` is a caller bug and may fail.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    /// Number of frames written so far.
    fn frames_written(&self) -> u64;
}
