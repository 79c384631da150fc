use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use super::FrameSink;
use crate::frame::Frame;

const JPEG_QUALITY: u8 = 90;

/// Frame-sequence sink: one numbered JPEG per frame in a directory.
///
/// File names encode the source frame index (`frame_000042.jpg`), so the
/// on-disk ordering matches the source ordering.
pub struct JpegSequenceSink {
    dir: PathBuf,
    frames_written: u64,
}

impl JpegSequenceSink {
    /// Create the output directory (if needed) and the sink.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("create output directory {}", dir.display()))?;
        Ok(Self {
            dir,
            frames_written: 0,
        })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

impl FrameSink for JpegSequenceSink {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        let path = self.dir.join(format!("frame_{:06}.jpg", frame.index));
        let file =
            File::create(&path).with_context(|| format!("create {}", path.display()))?;
        let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY);
        encoder
            .encode(
                frame.pixels(),
                frame.width,
                frame.height,
                ExtendedColorType::Rgb8,
            )
            .with_context(|| format!("encode {}", path.display()))?;
        self.frames_written += 1;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }
}
