//! Buffer pool configuration.

use crate::pool::PoolError;
use framepipe_pixelbuffer::{PixelFormat, MAX_BYTES_PER_PIXEL};
use serde::{Deserialize, Serialize};

/// Buffer pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum buffers per (width, height) size class.
    ///
    /// Once a class holds this many buffers (free plus checked out),
    /// further acquisitions block until a recycle.
    #[serde(default = "default_max_buffers")]
    pub max_buffers_per_class: usize,
    /// Row alignment in bytes; pitch is rounded up to a multiple of this.
    #[serde(default = "default_pitch_alignment")]
    pub pitch_alignment: usize,
}

fn default_max_buffers() -> usize {
    3
}

fn default_pitch_alignment() -> usize {
    4
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_buffers_per_class: default_max_buffers(),
            pitch_alignment: default_pitch_alignment(),
        }
    }
}

impl PoolConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_buffers_per_class == 0 {
            return Err(PoolError::Config(
                "max_buffers_per_class cannot be 0".to_string(),
            ));
        }
        if self.pitch_alignment == 0 {
            return Err(PoolError::Config("pitch_alignment cannot be 0".to_string()));
        }
        Ok(())
    }

    /// Bytes per row for `width` pixels of `format`, rounded up to the
    /// configured alignment.
    #[must_use]
    pub fn aligned_pitch(&self, width: u32, format: PixelFormat) -> usize {
        align_up(format.min_pitch(width), self.pitch_alignment)
    }

    /// Row storage covering the widest supported format at this width.
    ///
    /// Buffers are allocated at this capacity so a recycled buffer fits any
    /// layout the encoder negotiates later.
    #[must_use]
    pub fn row_capacity(&self, width: u32) -> usize {
        align_up(width as usize * MAX_BYTES_PER_PIXEL, self.pitch_alignment)
    }
}

fn align_up(n: usize, alignment: usize) -> usize {
    n.div_ceil(alignment) * alignment
}
