// Platform seam
// What the application needs from the windowing backend

use crate::input::Event;
use crate::surface::{PixelFormat, Surface};
use anyhow::Result;

/// A window with one drawable surface and an input queue
pub trait Platform {
    /// Pixel format of the window surface; loaded images are converted to it
    fn pixel_format(&self) -> PixelFormat;

    /// Window size in pixels
    fn size(&self) -> (u32, u32);

    /// Wait for input and return every event queued since the last call
    fn poll_events(&mut self) -> Result<Vec<Event>>;

    /// Scale `image` over the whole window and show it
    fn present(&mut self, image: &Surface) -> Result<()>;

    /// Destroy the window and disconnect
    fn shutdown(&mut self);
}
