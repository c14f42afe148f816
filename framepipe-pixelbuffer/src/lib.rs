//! Pixel format descriptions and frame buffer storage for the framepipe
//! producer pipeline.
//!
//! This crate provides the static format table consulted by every other
//! component, plus the owned [`FrameBuffer`] type the pool recycles across
//! frames.

pub mod buffer;
pub mod format;

pub use buffer::{FrameBuffer, FrameMetadata};
pub use format::{FormatInfo, FrameLayout, PixelFormat, FORMAT_TABLE, MAX_BYTES_PER_PIXEL};
