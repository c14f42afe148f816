//! Owned frame buffer storage.
//!
//! This module provides [`FrameBuffer`], the reusable block of memory a
//! buffer pool hands out for one frame at a time, and [`FrameMetadata`],
//! the per-frame description that travels with the pixels to the encoder.
//!
//! # Pitch is in bytes
//!
//! Pitch here is measured in **bytes** per row, matching what the encoder
//! boundary expects. It is at least `width * bytes_per_pixel` and may
//! include alignment padding at the end of each row.
//!
//! # Lifecycle
//!
//! A `FrameBuffer` is created once, on a pool miss, and then recycled for
//! the pool's whole lifetime: it sits either in a pool free list or inside
//! exactly one checkout guard, never both. Storage is sized for the widest
//! supported format so a recycled buffer can be relabeled to whatever
//! layout the encoder negotiates next without reallocating.

use crate::format::{FrameLayout, PixelFormat, MAX_BYTES_PER_PIXEL};
use framepipe_common::FrameSize;
use std::collections::TryReserveError;

/// Per-frame description handed to the encoder on submit.
///
/// Width, height, pitch, format and orientation travel with the pixel bytes
/// verbatim; the pipeline performs no conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Bytes per row, including any alignment padding.
    pub pitch: usize,
    /// Pixel channel layout.
    pub format: PixelFormat,
    /// True when the first row in memory is the visually bottom row.
    pub bottom_up: bool,
}

impl FrameMetadata {
    /// Frame dimensions as a size-class key.
    pub const fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    /// Total bytes described: `pitch * height`.
    pub const fn byte_len(&self) -> usize {
        self.pitch * self.height as usize
    }
}

/// A reusable block of frame storage plus its layout metadata.
///
/// Owns `row_capacity * height` contiguous zero-initialized bytes, of which
/// the first `pitch * height` form the current frame. The numeric id is
/// assigned by the pool at allocation and is stable across recycles, which
/// is what lets tests observe that a buffer really was reused.
#[derive(Debug)]
pub struct FrameBuffer {
    id: u64,
    size: FrameSize,
    pitch: usize,
    layout: FrameLayout,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Allocate zeroed storage of `row_capacity * size.height` bytes.
    ///
    /// `row_capacity` must cover the widest supported format for this
    /// width; the buffer starts labeled as top-down RGBA occupying the full
    /// row, and [`FrameBuffer::relabel`] re-labels it for the layout
    /// negotiated at each checkout.
    ///
    /// # Errors
    ///
    /// Returns the reservation error when the backing storage cannot be
    /// allocated.
    pub fn allocate(
        id: u64,
        size: FrameSize,
        row_capacity: usize,
    ) -> Result<Self, TryReserveError> {
        debug_assert!(row_capacity >= size.width as usize * MAX_BYTES_PER_PIXEL);
        let len = row_capacity * size.height as usize;
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, 0);
        Ok(Self {
            id,
            size,
            pitch: row_capacity,
            layout: FrameLayout::top_down(PixelFormat::Rgba),
            data,
        })
    }

    /// Re-label the buffer for a newly negotiated checkout.
    ///
    /// # Panics
    ///
    /// Panics if `pitch * height` does not fit the existing storage; size
    /// classes allocate rows at the widest supported format, so any
    /// supported layout of the same dimensions fits.
    pub fn relabel(&mut self, pitch: usize, layout: FrameLayout) {
        debug_assert!(pitch >= layout.format.min_pitch(self.size.width));
        assert!(
            pitch * self.size.height as usize <= self.data.len(),
            "pitch {} x height {} exceeds {}-byte allocation",
            pitch,
            self.size.height,
            self.data.len()
        );
        self.pitch = pitch;
        self.layout = layout;
    }

    /// Pool-assigned identity, stable across recycles.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Frame dimensions.
    pub fn size(&self) -> FrameSize {
        self.size
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.size.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Bytes per row for the current label.
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Current pixel layout.
    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// Bytes covered by the current label: `pitch * height`.
    pub fn byte_len(&self) -> usize {
        self.pitch * self.size.height as usize
    }

    /// The frame's pixel bytes under the current label.
    pub fn data(&self) -> &[u8] {
        &self.data[..self.byte_len()]
    }

    /// Writable pixel bytes under the current label.
    pub fn data_mut(&mut self) -> &mut [u8] {
        let len = self.byte_len();
        &mut self.data[..len]
    }

    /// The `width * bytes_per_pixel` pixel bytes of row `y` (memory order;
    /// trailing pitch padding is excluded).
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.pitch;
        &self.data[start..start + self.layout.format.min_pitch(self.size.width)]
    }

    /// Writable pixel bytes of row `y` (memory order).
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.pitch;
        let row = self.layout.format.min_pitch(self.size.width);
        &mut self.data[start..start + row]
    }

    /// Exact metadata for the current checkout, suitable for submit.
    pub fn metadata(&self) -> FrameMetadata {
        FrameMetadata {
            width: self.size.width,
            height: self.size.height,
            pitch: self.pitch,
            format: self.layout.format,
            bottom_up: self.layout.bottom_up,
        }
    }
}
