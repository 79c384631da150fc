use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Scripted backend: returns a pre-programmed number of rectangles per call.
///
/// Call `i` returns `counts[i]` detections; calls past the end of the script
/// return none. Used to test the pipeline's accumulation and annotation
/// without depending on any real detector behavior.
pub struct ScriptedBackend {
    counts: Vec<usize>,
    calls: usize,
}

impl ScriptedBackend {
    pub fn new(counts: Vec<usize>) -> Self {
        Self { counts, calls: 0 }
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let count = self.counts.get(self.calls).copied().unwrap_or(0);
        self.calls += 1;

        let side = 30u32.min(frame.width / 2).min(frame.height / 2).max(1);
        let mut boxes = Vec::with_capacity(count);
        for i in 0..count as u32 {
            let max_x = frame.width.saturating_sub(side);
            let x = (i * side * 2) % max_x.max(1);
            boxes.push(Detection {
                x,
                y: side / 2,
                width: side,
                height: side,
            });
        }
        Ok(boxes)
    }
}
