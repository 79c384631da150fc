/// A hypothesized vehicle location produced by a detector for one frame.
///
/// Coordinates are pixels in the frame that produced the detection; a
/// detection is ephemeral and meaningless for any other frame. Duplicate and
/// overlapping rectangles are possible and expected: no non-maximum
/// suppression is applied anywhere in the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Detection {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Detection {
    /// First column to the right of the rectangle.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// First row below the rectangle.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }
}
