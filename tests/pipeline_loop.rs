use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;

use roadwatch::annotate::annotate_frame;
use roadwatch::{
    CancelToken, Detection, DetectorBackend, Frame, FrameRead, FrameSink, MemorySink, Pipeline,
    ScriptedBackend, SourceConfig, SourceUnavailable, StopReason, VideoSource,
};

fn open_stub(identifier: &str) -> VideoSource {
    VideoSource::open(SourceConfig {
        identifier: identifier.to_string(),
        target_fps: 10,
        width: 160,
        height: 120,
    })
    .expect("open stub source")
}

fn scripted(counts: &[usize]) -> Arc<Mutex<dyn DetectorBackend>> {
    Arc::new(Mutex::new(ScriptedBackend::new(counts.to_vec())))
}

/// Sink wrapper that records frames, counts `finish` calls, and can inject a
/// stop request after a configured number of writes.
struct ObservedSink {
    inner: MemorySink,
    cancel_after: Option<(u64, CancelToken)>,
    finish_calls: Arc<AtomicU64>,
}

impl ObservedSink {
    fn new(inner: MemorySink) -> Self {
        Self {
            inner,
            cancel_after: None,
            finish_calls: Arc::new(AtomicU64::new(0)),
        }
    }

    fn cancel_after(mut self, frames: u64, token: CancelToken) -> Self {
        self.cancel_after = Some((frames, token));
        self
    }

    fn finish_counter(&self) -> Arc<AtomicU64> {
        self.finish_calls.clone()
    }
}

impl FrameSink for ObservedSink {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        self.inner.write(frame)?;
        if let Some((after, token)) = &self.cancel_after {
            if self.inner.frames_written() >= *after {
                token.cancel();
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finish_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.inner.frames_written()
    }
}

#[test]
fn zero_detections_leave_count_at_zero() {
    let source = open_stub("stub://campus?frames=20");
    let summary = Pipeline::new(source, scripted(&[])).run().unwrap();

    assert_eq!(summary.frames_processed, 20);
    assert_eq!(summary.total_detections, 0);
    assert_eq!(summary.stop_reason, StopReason::EndOfStream);
}

#[test]
fn final_count_is_sum_of_per_frame_counts() {
    let source = open_stub("stub://campus?frames=5");
    let summary = Pipeline::new(source, scripted(&[3, 1, 4, 1, 5])).run().unwrap();

    assert_eq!(summary.frames_processed, 5);
    assert_eq!(summary.total_detections, 14);
}

#[test]
fn nonexistent_source_fails_fast_with_source_unavailable() {
    let err = VideoSource::open(SourceConfig {
        identifier: "/nonexistent/campus_traffic.mp4".to_string(),
        ..SourceConfig::default()
    })
    .unwrap_err();

    let unavailable = err
        .root_cause()
        .downcast_ref::<SourceUnavailable>()
        .expect("SourceUnavailable in the error chain");
    assert_eq!(unavailable.identifier, "/nonexistent/campus_traffic.mp4");
}

#[test]
fn emitted_frames_preserve_source_order() {
    let recording = MemorySink::new();
    let source = open_stub("stub://campus?frames=12");
    let summary = Pipeline::new(source, scripted(&[]))
        .with_sink(Box::new(recording.clone()))
        .run()
        .unwrap();

    assert_eq!(summary.frames_processed, 12);
    let indices: Vec<u64> = recording.recorded().iter().map(|f| f.index).collect();
    assert_eq!(indices, (0..12).collect::<Vec<u64>>());
}

#[test]
fn stop_signal_after_frame_k_processes_exactly_k_plus_one_frames() {
    let k = 3u64;
    let recording = MemorySink::new();
    let source = open_stub("stub://campus?frames=100");
    let pipeline = Pipeline::new(source, scripted(&[]));
    let token = pipeline.cancel_token();

    let sink = ObservedSink::new(recording.clone()).cancel_after(k + 1, token);
    let finish_calls = sink.finish_counter();

    let summary = pipeline.with_sink(Box::new(sink)).run().unwrap();

    // The frame in progress completes; the stop lands at the next boundary.
    assert_eq!(summary.frames_processed, k + 1);
    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert_eq!(recording.len() as u64, k + 1);
    assert_eq!(finish_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn mid_stream_read_failure_closes_gracefully_and_is_distinguished() {
    let recording = MemorySink::new();
    let source = open_stub("stub://flaky?frames=10&fail_after=4");
    let sink = ObservedSink::new(recording.clone());
    let finish_calls = sink.finish_counter();

    let summary = Pipeline::new(source, scripted(&[]))
        .with_sink(Box::new(sink))
        .run()
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::ReadFailure);
    assert_eq!(summary.frames_processed, 4);
    assert_eq!(recording.len(), 4);
    assert_eq!(finish_calls.load(Ordering::SeqCst), 1);
}

/// A detector error must read as "nothing detected", not end the run.
struct FailingBackend;

impl DetectorBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        Err(anyhow::anyhow!("inference backend exploded"))
    }
}

#[test]
fn detector_failure_counts_as_zero_detections() {
    let source = open_stub("stub://campus?frames=6");
    let summary = Pipeline::new(source, Arc::new(Mutex::new(FailingBackend)))
        .run()
        .unwrap();

    assert_eq!(summary.frames_processed, 6);
    assert_eq!(summary.total_detections, 0);
    assert_eq!(summary.stop_reason, StopReason::EndOfStream);
}

#[test]
fn end_to_end_scenario_counts_and_annotates_cumulatively() {
    let counts = [0usize, 1, 0, 2, 0, 0, 1, 0, 0, 3];
    let cumulative = [0u64, 1, 1, 3, 3, 3, 4, 4, 4, 7];

    let recording = MemorySink::new();
    let source = open_stub("stub://campus?frames=10");
    let summary = Pipeline::new(source, scripted(&counts))
        .with_sink(Box::new(recording.clone()))
        .run()
        .unwrap();

    assert_eq!(summary.frames_processed, 10);
    assert_eq!(summary.total_detections, 7);
    assert_eq!(summary.stop_reason, StopReason::EndOfStream);

    let recorded = recording.recorded();
    assert_eq!(recorded.len(), 10);

    // Rebuild the expected annotated frames from an identical source and
    // script: the sink must contain exactly these, in this order.
    let mut reference_source = open_stub("stub://campus?frames=10");
    let mut reference_detector = ScriptedBackend::new(counts.to_vec());
    for (i, recorded_frame) in recorded.iter().enumerate() {
        let mut expected = match reference_source.next_frame().unwrap() {
            FrameRead::Frame(frame) => frame,
            FrameRead::EndOfStream => panic!("reference source ended early"),
        };
        let detections = reference_detector.detect(&expected).unwrap();
        assert_eq!(detections.len(), counts[i]);
        annotate_frame(&mut expected, &detections, cumulative[i]);

        assert_eq!(recorded_frame.index, i as u64);
        assert_eq!(
            recorded_frame.pixels(),
            expected.pixels(),
            "frame {} annotation mismatch",
            i
        );
    }
}
