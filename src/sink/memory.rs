use std::sync::{Arc, Mutex};

use anyhow::Result;

use super::FrameSink;
use crate::frame::Frame;

/// In-memory sink for testing.
///
/// Records a clone of every written frame in arrival order. The sink is
/// cheaply cloneable and clones share the same recording, so a test can keep
/// one handle while the pipeline owns the other.
#[derive(Clone, Default)]
pub struct MemorySink {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded frames, in write order.
    pub fn recorded(&self) -> Vec<Frame> {
        self.frames.lock().expect("memory sink lock").clone()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().expect("memory sink lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FrameSink for MemorySink {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        self.frames
            .lock()
            .expect("memory sink lock")
            .push(frame.clone());
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_recording() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();

        let frame = Frame::new(vec![1u8; 4 * 4 * 3], 4, 4, 7).unwrap();
        writer.write(&frame).unwrap();

        let recorded = sink.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].index, 7);
    }
}
