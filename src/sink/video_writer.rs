use std::path::Path;

use anyhow::{anyhow, Context, Result};
use opencv::{core, imgproc, prelude::*, videoio};

use super::FrameSink;
use crate::frame::Frame;
use crate::source::SourceFormat;

/// Video container sink backed by an OpenCV `VideoWriter`.
///
/// Writes MJPEG at the source resolution and frame rate, matching the
/// pipeline contract that output mirrors the input format.
pub struct VideoWriterSink {
    writer: videoio::VideoWriter,
    format: SourceFormat,
    frames_written: u64,
    finished: bool,
}

impl VideoWriterSink {
    pub fn new(path: &Path, format: SourceFormat) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("output path is not valid UTF-8"))?;
        let fourcc = videoio::VideoWriter::fourcc('M', 'J', 'P', 'G')
            .context("resolve MJPG fourcc")?;
        let size = core::Size::new(format.width as i32, format.height as i32);
        let writer = videoio::VideoWriter::new(path_str, fourcc, format.fps as f64, size, true)
            .with_context(|| format!("open video writer {}", path_str))?;
        if !writer.is_opened()? {
            return Err(anyhow!("video writer failed to open {}", path_str));
        }
        Ok(Self {
            writer,
            format,
            frames_written: 0,
            finished: false,
        })
    }
}

impl FrameSink for VideoWriterSink {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        if self.finished {
            return Err(anyhow!("video writer already finished"));
        }
        if frame.width != self.format.width || frame.height != self.format.height {
            return Err(anyhow!(
                "frame is {}x{}, writer expects {}x{}",
                frame.width,
                frame.height,
                self.format.width,
                self.format.height
            ));
        }

        let flat = core::Mat::from_slice(frame.pixels()).context("wrap frame pixels")?;
        let rgb = flat
            .reshape(3, frame.height as i32)
            .context("reshape frame pixels")?;
        let mut bgr = core::Mat::default();
        imgproc::cvt_color(
            &rgb,
            &mut bgr,
            imgproc::COLOR_RGB2BGR,
            0,
            core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .context("convert frame to BGR")?;
        self.writer.write(&bgr).context("write video frame")?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if !self.finished {
            self.writer.release().context("release video writer")?;
            self.finished = true;
        }
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }
}
