//! Local video file source using FFmpeg.
//!
//! Decodes a local container to RGB24 in-memory. End of the packet stream is
//! reported as `FrameRead::EndOfStream` after the decoder has been drained;
//! decode faults surface as errors (mid-stream read failure).

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;
use std::path::Path;

use super::{FrameRead, SourceFormat};
use crate::frame::Frame;

pub(crate) struct FfmpegFileSource {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    format: SourceFormat,
    frame_count: u64,
    sent_eof: bool,
}

impl FfmpegFileSource {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open '{}' with ffmpeg", path.display()))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("'{}' has no video track", path.display()))?;
        let stream_index = input_stream.index();

        let rate = input_stream.avg_frame_rate();
        let fps = if rate.denominator() > 0 {
            ((rate.numerator() as f64 / rate.denominator() as f64).round() as u32).max(1)
        } else {
            25
        };

        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        let format = SourceFormat {
            width: decoder.width(),
            height: decoder.height(),
            fps,
        };

        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler,
            format,
            frame_count: 0,
            sent_eof: false,
        })
    }

    pub(crate) fn next_frame(&mut self) -> Result<FrameRead> {
        let mut decoded = ffmpeg::frame::Video::empty();

        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.scale_to_frame(&decoded).map(FrameRead::Frame);
            }
            if self.sent_eof {
                return Ok(FrameRead::EndOfStream);
            }

            // Feed the next video packet; exhausting the container flushes
            // the decoder before end-of-stream is reported.
            let mut fed = false;
            for (stream, packet) in self.input.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }
                self.decoder
                    .send_packet(&packet)
                    .context("send packet to ffmpeg decoder")?;
                fed = true;
                break;
            }
            if !fed {
                self.decoder
                    .send_eof()
                    .context("flush ffmpeg decoder at end of file")?;
                self.sent_eof = true;
            }
        }
    }

    fn scale_to_frame(&mut self, decoded: &ffmpeg::frame::Video) -> Result<Frame> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let pixels = packed_rgb24(&rgb_frame)?;

        let index = self.frame_count;
        self.frame_count += 1;

        Frame::new(pixels, rgb_frame.width(), rgb_frame.height(), index)
    }

    pub(crate) fn format(&self) -> SourceFormat {
        self.format
    }

    pub(crate) fn is_healthy(&self) -> bool {
        !self.sent_eof
    }

    pub(crate) fn frames_read(&self) -> u64 {
        self.frame_count
    }
}

/// Copy an ffmpeg RGB24 plane into a tightly packed buffer, dropping any
/// row padding the decoder added.
fn packed_rgb24(frame: &ffmpeg::frame::Video) -> Result<Vec<u8>> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let row_bytes = width * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        return Ok(data.to_vec());
    }

    let mut pixels = Vec::with_capacity(row_bytes * height);
    for row in 0..height {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }
    Ok(pixels)
}
