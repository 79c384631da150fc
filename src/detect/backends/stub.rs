use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Stub backend for testing and demos.
///
/// Hashes each frame's pixels and compares against the previous frame: an
/// unchanged scene yields no detections, a changed scene yields up to three
/// rectangles placed deterministically from the hash bytes. No model file,
/// no external dependency, fully reproducible for a given frame sequence.
pub struct StubBackend {
    last_hash: Option<[u8; 32]>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { last_hash: None }
    }

    fn boxes_from_hash(hash: &[u8; 32], width: u32, height: u32) -> Vec<Detection> {
        let count = (hash[0] % 4) as usize;
        let mut boxes = Vec::with_capacity(count);
        for i in 0..count {
            let side = 24 + (hash[3 * i + 3] % 24) as u32;
            if width <= side || height <= side {
                continue;
            }
            let x = hash[3 * i + 1] as u32 * (width - side) / 255;
            let y = hash[3 * i + 2] as u32 * (height - side) / 255;
            boxes.push(Detection {
                x,
                y,
                width: side,
                height: side,
            });
        }
        boxes
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let current_hash: [u8; 32] = Sha256::digest(frame.pixels()).into();

        let changed = match self.last_hash {
            Some(prev) => prev != current_hash,
            None => false,
        };

        self.last_hash = Some(current_hash);

        if !changed {
            return Ok(vec![]);
        }
        Ok(Self::boxes_from_hash(&current_hash, frame.width, frame.height))
    }
}
