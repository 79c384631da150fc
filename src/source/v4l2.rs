//! V4L2 capture device source.
//!
//! Opens a local device node by index (`/dev/video<N>`) and captures RGB24
//! frames through a memory-mapped buffer stream. Device streams are
//! unbounded; they never report end-of-stream, only read failures.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::{FrameRead, SourceConfig, SourceFormat};
use crate::frame::Frame;

pub(crate) struct V4l2DeviceSource {
    state: DeviceState,
    format: SourceFormat,
    frame_count: u64,
    last_error: Option<String>,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2DeviceSource {
    pub(crate) fn open(index: u32, config: &SourceConfig) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let path = format!("/dev/video{}", index);
        let mut device =
            v4l::Device::with_path(&path).with_context(|| format!("open v4l2 device {}", path))?;

        let mut format = device.format().context("read v4l2 format")?;
        format.width = config.width;
        format.height = config.height;
        // Only packed RGB24 capture is handled downstream.
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("V4l2DeviceSource: failed to set format on {}: {}", path, err);
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };
        if &format.fourcc.repr != b"RGB3" {
            return Err(anyhow!(
                "device {} does not offer RGB24 capture (got {})",
                path,
                format.fourcc
            ));
        }

        if config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!("V4l2DeviceSource: failed to set fps on {}: {}", path, err);
            }
        }

        let source_format = SourceFormat {
            width: format.width,
            height: format.height,
            fps: config.target_fps.max(1),
        };

        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        Ok(Self {
            state,
            format: source_format,
            frame_count: 0,
            last_error: None,
        })
    }

    pub(crate) fn next_frame(&mut self) -> Result<FrameRead> {
        use v4l::io::traits::CaptureStream;

        let capture = self.state.with_mut(|fields| fields.stream.next());
        let (buf, _meta) = match capture {
            Ok(capture) => capture,
            Err(err) => {
                self.last_error = Some(err.to_string());
                return Err(anyhow::Error::new(err).context("capture v4l2 frame"));
            }
        };

        let index = self.frame_count;
        self.frame_count += 1;

        let frame = Frame::new(buf.to_vec(), self.format.width, self.format.height, index)?;
        Ok(FrameRead::Frame(frame))
    }

    pub(crate) fn format(&self) -> SourceFormat {
        self.format
    }

    pub(crate) fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    pub(crate) fn frames_read(&self) -> u64 {
        self.frame_count
    }
}
