//! Synthetic frame source (`stub://`).
//!
//! Generates a deterministic moving pixel pattern in-memory. Used by tests
//! and demos so the pipeline can run without a camera, a video file, or any
//! decoder feature compiled in.

use anyhow::{anyhow, Result};

use super::{FrameRead, SourceConfig, SourceFormat};
use crate::frame::Frame;

pub(crate) struct SyntheticSource {
    width: u32,
    height: u32,
    fps: u32,
    frame_limit: Option<u64>,
    fail_after: Option<u64>,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticSource {
    pub(crate) fn new(
        config: &SourceConfig,
        frame_limit: Option<u64>,
        fail_after: Option<u64>,
    ) -> Self {
        Self {
            width: config.width,
            height: config.height,
            fps: config.target_fps,
            frame_limit,
            fail_after,
            frame_count: 0,
            scene_state: 0,
        }
    }

    pub(crate) fn next_frame(&mut self) -> Result<FrameRead> {
        if let Some(fail_after) = self.fail_after {
            if self.frame_count >= fail_after {
                return Err(anyhow!(
                    "synthetic read fault injected after {} frames",
                    fail_after
                ));
            }
        }
        if let Some(limit) = self.frame_limit {
            if self.frame_count >= limit {
                return Ok(FrameRead::EndOfStream);
            }
        }

        let index = self.frame_count;
        let pixels = self.generate_synthetic_pixels();
        self.frame_count += 1;

        let frame = Frame::new(pixels, self.width, self.height, index)?;
        Ok(FrameRead::Frame(frame))
    }

    /// Generate deterministic pixel data.
    ///
    /// Simulates a scene with occasional changes: most frames drift slowly,
    /// and every 50th frame the scene state shifts.
    fn generate_synthetic_pixels(&mut self) -> Vec<u8> {
        let pixel_count = (self.width * self.height * 3) as usize;

        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }

    pub(crate) fn format(&self) -> SourceFormat {
        SourceFormat {
            width: self.width,
            height: self.height,
            fps: self.fps,
        }
    }

    pub(crate) fn is_healthy(&self) -> bool {
        true
    }

    pub(crate) fn frames_read(&self) -> u64 {
        self.frame_count
    }
}
