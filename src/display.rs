//! Frame display.
//!
//! The display is optional and strictly an emit-side concern. Stop requests
//! from the display (the `q` keypress) are routed through the pipeline's
//! `CancelToken` rather than acted on inside the display, so the loop keeps
//! one cancellation path and tests can run fully headless.

use anyhow::Result;

use crate::frame::Frame;
use crate::pipeline::CancelToken;

/// Presents annotated frames to an operator.
pub trait FrameDisplay: Send {
    /// Present one frame. A display with user input may request a stop by
    /// cancelling the token; the pipeline honors it at the next frame
    /// boundary.
    fn show(&mut self, frame: &Frame, stop: &CancelToken) -> Result<()>;
}

/// Headless display: frames are dropped after emit. Used when no window is
/// wanted (tests, servers, the default daemon configuration).
#[derive(Default)]
pub struct HeadlessDisplay;

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self
    }
}

impl FrameDisplay for HeadlessDisplay {
    fn show(&mut self, _frame: &Frame, _stop: &CancelToken) -> Result<()> {
        Ok(())
    }
}

#[cfg(feature = "display-highgui")]
pub use highgui_display::HighguiDisplay;

#[cfg(feature = "display-highgui")]
mod highgui_display {
    use anyhow::{Context, Result};
    use opencv::{core, highgui, imgproc, prelude::*};

    use super::FrameDisplay;
    use crate::frame::Frame;
    use crate::pipeline::CancelToken;

    const STOP_KEY: i32 = 'q' as i32;
    const ESC_KEY: i32 = 27;

    /// Interactive window display.
    ///
    /// Shows each frame and polls the keyboard with a bounded 1 ms wait;
    /// `q` or ESC cancels the pipeline's token.
    pub struct HighguiDisplay {
        window: String,
    }

    impl HighguiDisplay {
        pub fn new(window: impl Into<String>) -> Result<Self> {
            let window = window.into();
            highgui::named_window(&window, highgui::WINDOW_AUTOSIZE)
                .with_context(|| format!("open display window '{}'", window))?;
            Ok(Self { window })
        }
    }

    impl FrameDisplay for HighguiDisplay {
        fn show(&mut self, frame: &Frame, stop: &CancelToken) -> Result<()> {
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

            highgui::imshow(&self.window, &bgr).context("show frame")?;
            let key = highgui::wait_key(1).context("poll keyboard")?;
            if key == STOP_KEY || key == ESC_KEY {
                log::info!("stop key pressed, finishing current frame");
                stop.cancel();
            }
            Ok(())
        }
    }

    impl Drop for HighguiDisplay {
        fn drop(&mut self) {
            if let Err(err) = highgui::destroy_window(&self.window) {
                log::debug!("failed to destroy window '{}': {}", self.window, err);
            }
        }
    }
}
