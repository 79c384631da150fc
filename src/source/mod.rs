//! Frame sources.
//!
//! This module provides sequential frame input for the pipeline:
//! - Synthetic sources (`stub://`, testing)
//! - Local video files (feature: ingest-file-ffmpeg)
//! - V4L2 capture devices (feature: ingest-v4l2)
//!
//! All sources produce `Frame` instances in strict sequence order. A read
//! yields a tagged `FrameRead`: `EndOfStream` is the normal exhaustion signal
//! and is not an error; an `Err` from `next_frame` is a mid-stream read
//! failure. The two are never conflated, so callers can alert on the latter.
//!
//! Opening a source that does not exist (missing file, bad device index,
//! unreadable codec) fails with `SourceUnavailable` before any frame is read.

mod synthetic;

#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
#[cfg(feature = "ingest-v4l2")]
pub(crate) mod v4l2;

use std::fmt;
use std::path::PathBuf;

use anyhow::{anyhow, Error, Result};

use crate::frame::Frame;
use synthetic::SyntheticSource;

/// The source could not be opened. Fatal, reported before loop entry.
///
/// Carried inside `anyhow` chains; binaries downcast to it to pick a distinct
/// exit code for "could not open video source".
#[derive(Debug)]
pub struct SourceUnavailable {
    pub identifier: String,
    pub reason: String,
}

impl fmt::Display for SourceUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "video source '{}' unavailable: {}",
            self.identifier, self.reason
        )
    }
}

impl std::error::Error for SourceUnavailable {}

impl SourceUnavailable {
    fn err(identifier: &str, reason: impl Into<String>) -> Error {
        Error::new(Self {
            identifier: identifier.to_string(),
            reason: reason.into(),
        })
    }
}

/// Parsed source identifier.
///
/// Accepted forms:
/// - `stub://<name>[?frames=N][&fail_after=K]` - synthetic source
/// - `<path>` - local video file (no URL schemes)
/// - `<N>` or `device:<N>` - V4L2 device index
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSpec {
    Synthetic {
        name: String,
        /// Stop after this many frames. Unbounded when absent.
        frames: Option<u64>,
        /// Fail the read after this many frames (testing read-failure paths).
        fail_after: Option<u64>,
    },
    File(PathBuf),
    Device(u32),
}

impl SourceSpec {
    pub fn parse(identifier: &str) -> Result<Self> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(anyhow!("source identifier is empty"));
        }
        if let Some(rest) = identifier.strip_prefix("stub://") {
            let (name, query) = match rest.split_once('?') {
                Some((name, query)) => (name, Some(query)),
                None => (rest, None),
            };
            let mut frames = None;
            let mut fail_after = None;
            if let Some(query) = query {
                for pair in query.split('&') {
                    match pair.split_once('=') {
                        Some(("frames", value)) => {
                            frames = Some(value.parse().map_err(|_| {
                                anyhow!("stub frames must be an integer, got '{}'", value)
                            })?);
                        }
                        Some(("fail_after", value)) => {
                            fail_after = Some(value.parse().map_err(|_| {
                                anyhow!("stub fail_after must be an integer, got '{}'", value)
                            })?);
                        }
                        _ => return Err(anyhow!("unknown stub source option '{}'", pair)),
                    }
                }
            }
            return Ok(Self::Synthetic {
                name: name.to_string(),
                frames,
                fail_after,
            });
        }
        if identifier.contains("://") {
            return Err(anyhow!(
                "source identifiers must be local (no URL schemes): '{}'",
                identifier
            ));
        }
        if let Some(index) = identifier.strip_prefix("device:") {
            let index = index
                .parse()
                .map_err(|_| anyhow!("device index must be an integer, got '{}'", index))?;
            return Ok(Self::Device(index));
        }
        if let Ok(index) = identifier.parse::<u32>() {
            return Ok(Self::Device(index));
        }
        Ok(Self::File(PathBuf::from(identifier)))
    }
}

/// Configuration for opening a video source.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// Source identifier (see `SourceSpec`).
    pub identifier: String,
    /// Target frame rate. Synthetic and device sources honor this; file
    /// sources report the container's native rate.
    pub target_fps: u32,
    /// Preferred frame width (synthetic and device sources).
    pub width: u32,
    /// Preferred frame height (synthetic and device sources).
    pub height: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            identifier: "stub://traffic".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Fixed properties of an open source, propagated to sinks so output matches
/// the source resolution and frame rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceFormat {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Result of one read from a source.
#[derive(Debug)]
pub enum FrameRead {
    Frame(Frame),
    /// The source is exhausted. Normal termination, not an error.
    EndOfStream,
}

/// Statistics for an open source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_read: u64,
    pub identifier: String,
}

/// An open, read-only sequence of frames.
pub struct VideoSource {
    backend: SourceBackend,
    identifier: String,
}

impl std::fmt::Debug for VideoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSource")
            .field("identifier", &self.identifier)
            .finish()
    }
}

enum SourceBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    File(file_ffmpeg::FfmpegFileSource),
    #[cfg(feature = "ingest-v4l2")]
    Device(v4l2::V4l2DeviceSource),
}

impl VideoSource {
    /// Open the source named by `config.identifier`.
    ///
    /// Fails with `SourceUnavailable` when the file is missing, the device
    /// cannot be opened, the codec is unreadable, or the required ingest
    /// feature is not compiled in. No frame is ever read from a source that
    /// failed to open.
    pub fn open(config: SourceConfig) -> Result<Self> {
        let identifier = config.identifier.clone();
        let spec = SourceSpec::parse(&identifier)?;
        let backend = match spec {
            SourceSpec::Synthetic {
                name,
                frames,
                fail_after,
            } => {
                log::info!("VideoSource: opened stub://{} (synthetic)", name);
                SourceBackend::Synthetic(SyntheticSource::new(&config, frames, fail_after))
            }
            SourceSpec::File(path) => {
                if !path.is_file() {
                    return Err(SourceUnavailable::err(
                        &identifier,
                        format!("no such file: {}", path.display()),
                    ));
                }
                #[cfg(feature = "ingest-file-ffmpeg")]
                {
                    let source = file_ffmpeg::FfmpegFileSource::open(&path).map_err(|e| {
                        SourceUnavailable::err(&identifier, format!("{:#}", e))
                    })?;
                    log::info!("VideoSource: opened {} (ffmpeg)", path.display());
                    SourceBackend::File(source)
                }
                #[cfg(not(feature = "ingest-file-ffmpeg"))]
                {
                    return Err(SourceUnavailable::err(
                        &identifier,
                        "file decoding requires the ingest-file-ffmpeg feature",
                    ));
                }
            }
            SourceSpec::Device(index) => {
                #[cfg(feature = "ingest-v4l2")]
                {
                    let source = v4l2::V4l2DeviceSource::open(index, &config).map_err(|e| {
                        SourceUnavailable::err(&identifier, format!("{:#}", e))
                    })?;
                    log::info!("VideoSource: opened device {} (v4l2)", index);
                    SourceBackend::Device(source)
                }
                #[cfg(not(feature = "ingest-v4l2"))]
                {
                    let _ = index;
                    return Err(SourceUnavailable::err(
                        &identifier,
                        "device capture requires the ingest-v4l2 feature",
                    ));
                }
            }
        };
        Ok(Self {
            backend,
            identifier,
        })
    }

    /// Read the next frame in sequence order.
    ///
    /// `Ok(FrameRead::EndOfStream)` means the source is exhausted; `Err`
    /// means the source failed mid-stream.
    pub fn next_frame(&mut self) -> Result<FrameRead> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            SourceBackend::File(source) => source.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            SourceBackend::Device(source) => source.next_frame(),
        }
    }

    /// Fixed format of this source.
    pub fn format(&self) -> SourceFormat {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.format(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            SourceBackend::File(source) => source.format(),
            #[cfg(feature = "ingest-v4l2")]
            SourceBackend::Device(source) => source.format(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.is_healthy(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            SourceBackend::File(source) => source.is_healthy(),
            #[cfg(feature = "ingest-v4l2")]
            SourceBackend::Device(source) => source.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> SourceStats {
        let frames_read = match &self.backend {
            SourceBackend::Synthetic(source) => source.frames_read(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            SourceBackend::File(source) => source.frames_read(),
            #[cfg(feature = "ingest-v4l2")]
            SourceBackend::Device(source) => source.frames_read(),
        };
        SourceStats {
            frames_read,
            identifier: self.identifier.clone(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stub_identifiers() {
        assert_eq!(
            SourceSpec::parse("stub://campus").unwrap(),
            SourceSpec::Synthetic {
                name: "campus".to_string(),
                frames: None,
                fail_after: None,
            }
        );
        assert_eq!(
            SourceSpec::parse("stub://campus?frames=10&fail_after=3").unwrap(),
            SourceSpec::Synthetic {
                name: "campus".to_string(),
                frames: Some(10),
                fail_after: Some(3),
            }
        );
        assert!(SourceSpec::parse("stub://campus?loop=1").is_err());
    }

    #[test]
    fn parses_device_and_file_identifiers() {
        assert_eq!(SourceSpec::parse("0").unwrap(), SourceSpec::Device(0));
        assert_eq!(SourceSpec::parse("device:2").unwrap(), SourceSpec::Device(2));
        assert_eq!(
            SourceSpec::parse("campus_traffic.mp4").unwrap(),
            SourceSpec::File(PathBuf::from("campus_traffic.mp4"))
        );
        assert!(SourceSpec::parse("rtsp://camera-1").is_err());
        assert!(SourceSpec::parse("").is_err());
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let config = SourceConfig {
            identifier: "/nonexistent/campus_traffic.mp4".to_string(),
            ..SourceConfig::default()
        };
        let err = VideoSource::open(config).unwrap_err();
        assert!(err.root_cause().downcast_ref::<SourceUnavailable>().is_some());
    }

    #[test]
    fn synthetic_source_honors_frame_limit() {
        let config = SourceConfig {
            identifier: "stub://campus?frames=2".to_string(),
            ..SourceConfig::default()
        };
        let mut source = VideoSource::open(config).unwrap();
        assert!(matches!(source.next_frame().unwrap(), FrameRead::Frame(_)));
        assert!(matches!(source.next_frame().unwrap(), FrameRead::Frame(_)));
        assert!(matches!(
            source.next_frame().unwrap(),
            FrameRead::EndOfStream
        ));
        assert_eq!(source.stats().frames_read, 2);
    }

    #[test]
    fn synthetic_source_fails_after_configured_frame() {
        let config = SourceConfig {
            identifier: "stub://flaky?fail_after=1".to_string(),
            ..SourceConfig::default()
        };
        let mut source = VideoSource::open(config).unwrap();
        assert!(matches!(source.next_frame().unwrap(), FrameRead::Frame(_)));
        assert!(source.next_frame().is_err());
    }
}
