//! Frame container.
//!
//! A `Frame` is one still image pulled from a video source:
//! - Owned RGB24 pixel buffer (3 bytes per pixel, row-major)
//! - Fixed dimensions for a given source
//! - A sequence index (position in the stream, no other identity)
//!
//! Frames are created by the source layer, mutated in place by the annotator,
//! and dropped after they have been emitted.

use anyhow::{anyhow, Result};

/// Bytes per RGB24 pixel.
pub const BYTES_PER_PIXEL: usize = 3;

/// One decoded video frame in RGB24.
#[derive(Clone, Debug)]
pub struct Frame {
    pixels: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Position in the source sequence, starting at 0.
    pub index: u64,
}

impl Frame {
    /// Create a frame from an RGB24 buffer.
    ///
    /// The buffer length must be exactly `width * height * 3`.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, index: u64) -> Result<Self> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(anyhow!(
                "frame buffer is {} bytes, expected {} for {}x{} RGB24",
                pixels.len(),
                expected,
                width,
                height
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            index,
        })
    }

    /// Read-only pixel buffer.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable pixel buffer, for in-place annotation.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Byte offset of the pixel at (x, y). None when out of bounds.
    pub fn pixel_offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL)
    }

    /// Single-channel luma plane (BT.601 integer approximation).
    ///
    /// Detector backends that expect grayscale input (the cascade classifier
    /// does) convert through this rather than re-deriving it per backend.
    pub fn luma(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|px| {
                let r = px[0] as u32;
                let g = px[1] as u32;
                let b = px[2] as u32;
                ((77 * r + 150 * g + 29 * b) >> 8) as u8
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_buffer_length() {
        assert!(Frame::new(vec![0u8; 11], 2, 2, 0).is_err());
        assert!(Frame::new(vec![0u8; 12], 2, 2, 0).is_ok());
    }

    #[test]
    fn pixel_offset_bounds() {
        let frame = Frame::new(vec![0u8; 4 * 2 * 3], 4, 2, 0).unwrap();
        assert_eq!(frame.pixel_offset(0, 0), Some(0));
        assert_eq!(frame.pixel_offset(3, 1), Some((4 + 3) * 3));
        assert_eq!(frame.pixel_offset(4, 0), None);
        assert_eq!(frame.pixel_offset(0, 2), None);
    }

    #[test]
    fn luma_of_white_is_near_255() {
        let frame = Frame::new(vec![255u8; 2 * 2 * 3], 2, 2, 0).unwrap();
        let luma = frame.luma();
        assert_eq!(luma.len(), 4);
        assert!(luma.iter().all(|&v| v >= 254));
    }
}
