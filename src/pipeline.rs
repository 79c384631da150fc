//! Frame processing loop.
//!
//! The pipeline owns a video source, a detector backend, an optional sink,
//! a display, and a running count. Each iteration pulls one frame, runs
//! detection, accumulates the count, annotates the frame in place, and emits
//! it. The loop is single-threaded and synchronous: a frame is fully
//! processed before the next one is pulled.
//!
//! Termination is cooperative. The cancel token is checked once per
//! iteration at the frame boundary, so a stop request lets the frame in
//! progress complete. End of stream, a mid-stream read failure, and a stop
//! request all close the loop gracefully and release the sink exactly once;
//! the distinction survives in `RunSummary::stop_reason`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::annotate::annotate_frame;
use crate::detect::{Detection, DetectorBackend};
use crate::display::{FrameDisplay, HeadlessDisplay};
use crate::frame::Frame;
use crate::sink::FrameSink;
use crate::source::{FrameRead, VideoSource};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Cooperative stop signal.
///
/// Clones share the flag. Cancellation is one-way: once set, the token stays
/// cancelled for the lifetime of the run.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Process-lifetime detection accumulator.
///
/// Adds the length of each frame's detection list; monotonically
/// non-decreasing. This is NOT a unique-vehicle count: a vehicle visible in
/// ten frames contributes ten. Owned by the pipeline instance, so several
/// pipelines in one process keep independent counts.
#[derive(Debug, Default)]
pub struct RunningCount(u64);

impl RunningCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, detections: usize) {
        self.0 += detections as u64;
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The source was exhausted normally.
    EndOfStream,
    /// A stop was requested (keypress, ctrl-c, or programmatic cancel).
    Cancelled,
    /// The source failed mid-stream. The loop still closed gracefully;
    /// callers that care can alert on this.
    ReadFailure,
}

/// Outcome of a completed run.
#[derive(Clone, Copy, Debug)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub total_detections: u64,
    pub stop_reason: StopReason,
}

/// The frame processing loop.
pub struct Pipeline {
    source: VideoSource,
    detector: Arc<Mutex<dyn DetectorBackend>>,
    sink: Option<Box<dyn FrameSink>>,
    display: Box<dyn FrameDisplay>,
    cancel: CancelToken,
    count: RunningCount,
    frames_processed: u64,
    sink_write_failures: u64,
}

impl Pipeline {
    /// Build a pipeline over an open source. Headless and sinkless until
    /// configured otherwise.
    pub fn new(source: VideoSource, detector: Arc<Mutex<dyn DetectorBackend>>) -> Self {
        Self {
            source,
            detector,
            sink: None,
            display: Box::new(HeadlessDisplay::new()),
            cancel: CancelToken::new(),
            count: RunningCount::new(),
            frames_processed: 0,
            sink_write_failures: 0,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_display(mut self, display: Box<dyn FrameDisplay>) -> Self {
        self.display = display;
        self
    }

    /// Handle to the pipeline's stop signal. Cancelling it stops the loop at
    /// the next frame boundary; the frame in progress completes.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run to completion.
    ///
    /// Consumes the pipeline; the sink is finished and the display released
    /// exactly once, on every exit path.
    pub fn run(mut self) -> Result<RunSummary> {
        if let Err(err) = self
            .detector
            .lock()
            .map_err(|_| anyhow!("detector lock poisoned"))
            .and_then(|mut guard| guard.warm_up())
        {
            log::warn!("detector warm-up failed: {:#}", err);
        }

        let outcome = self.run_loop();
        self.release();
        let stop_reason = outcome?;

        log::info!(
            "pipeline finished: {} frames, {} detections, reason {:?}",
            self.frames_processed,
            self.count.get(),
            stop_reason
        );
        Ok(RunSummary {
            frames_processed: self.frames_processed,
            total_detections: self.count.get(),
            stop_reason,
        })
    }

    fn run_loop(&mut self) -> Result<StopReason> {
        let mut last_health_log = Instant::now();

        loop {
            // Cooperative stop, checked between frames only.
            if self.cancel.is_cancelled() {
                return Ok(StopReason::Cancelled);
            }

            let mut frame = match self.source.next_frame() {
                Ok(FrameRead::Frame(frame)) => frame,
                Ok(FrameRead::EndOfStream) => return Ok(StopReason::EndOfStream),
                Err(err) => {
                    log::error!("source read failed mid-stream: {:#}", err);
                    return Ok(StopReason::ReadFailure);
                }
            };

            let detections = self.detect(&frame)?;
            self.count.add(detections.len());
            annotate_frame(&mut frame, &detections, self.count.get());

            if let Some(sink) = self.sink.as_mut() {
                // Loss of the output artifact must not stop detection or
                // display: log and keep going.
                if let Err(err) = sink.write(&frame) {
                    self.sink_write_failures += 1;
                    log::warn!("sink write failed for frame {}: {:#}", frame.index, err);
                }
            }
            self.display.show(&frame, &self.cancel)?;

            self.frames_processed += 1;

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = self.source.stats();
                log::debug!(
                    "source health={} frames={} count={} identifier={}",
                    self.source.is_healthy(),
                    stats.frames_read,
                    self.count.get(),
                    stats.identifier
                );
                last_health_log = Instant::now();
            }
        }
    }

    /// Run detection on one frame.
    ///
    /// A detector error is reported and treated as "nothing detected": the
    /// external capability is assumed to only ever return an empty result,
    /// and a single bad frame must not end the run.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let mut guard = self
            .detector
            .lock()
            .map_err(|_| anyhow!("detector lock poisoned"))?;
        match guard.detect(frame) {
            Ok(detections) => Ok(detections),
            Err(err) => {
                log::warn!(
                    "detector '{}' failed on frame {}: {:#} (treated as no detections)",
                    guard.name(),
                    frame.index,
                    err
                );
                Ok(vec![])
            }
        }
    }

    fn release(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(err) = sink.finish() {
                log::warn!("sink finish failed: {:#}", err);
            }
        }
        if self.sink_write_failures > 0 {
            log::warn!(
                "{} frame(s) were lost to sink write failures",
                self.sink_write_failures
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_count_is_additive() {
        let mut count = RunningCount::new();
        assert_eq!(count.get(), 0);
        count.add(0);
        count.add(3);
        count.add(2);
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn cancel_token_is_shared_and_sticky() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(clone.is_cancelled());
    }
}
