//! Common types for the framepipe producer pipeline.
//!
//! This crate provides shared types used across the frame producer implementation:
//! - [`FrameSize`] - frame dimensions in pixels, the pool's size-class key
//! - [`DisplayTarget`] - display/window identity a session is bound to

use std::fmt;

/// Frame dimensions in pixels.
///
/// Buffers are pooled per exact (width, height) pair, so this type doubles
/// as the pool's size-class key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// Create a new frame size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count.
    pub const fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True if either dimension is zero.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Identity of the display and window a producer session is bound to.
///
/// Opaque to the pipeline core: it is validated by the encoder collaborator
/// at session init and passed through unchanged afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayTarget {
    /// Display connection name, e.g. `":0"`.
    pub display: String,
    /// Window identifier on that display.
    pub window: u64,
}

impl DisplayTarget {
    /// Create a new display target.
    pub fn new(display: impl Into<String>, window: u64) -> Self {
        Self {
            display: display.into(),
            window,
        }
    }
}

impl fmt::Display for DisplayTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} window 0x{:x}", self.display, self.window)
    }
}
