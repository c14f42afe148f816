//! Property tests for pool bookkeeping.
//!
//! These tests verify the pool's two load-bearing invariants over random
//! operation sequences: per-class population never exceeds the configured
//! capacity, and every handed-out buffer's pitch covers its format at the
//! configured alignment.

#[cfg(test)]
mod tests {
    use crate::config::PoolConfig;
    use crate::pool::BufferPool;
    use framepipe_common::FrameSize;
    use framepipe_pixelbuffer::{FrameLayout, PixelFormat};
    use proptest::prelude::*;

    fn arbitrary_format() -> impl Strategy<Value = PixelFormat> {
        prop::sample::select(vec![
            PixelFormat::Rgb,
            PixelFormat::Rgba,
            PixelFormat::Bgr,
            PixelFormat::Bgra,
            PixelFormat::Abgr,
        ])
    }

    proptest! {
        /// Random interleavings of non-blocking acquires and releases across
        /// three size classes never overshoot the capacity bound, and the
        /// checked-out count always matches the live guards.
        #[test]
        fn checked_out_never_exceeds_capacity(
            capacity in 1usize..4,
            ops in prop::collection::vec((prop::bool::ANY, 0usize..3), 1..40),
            format in arbitrary_format(),
        ) {
            let pool = BufferPool::new(PoolConfig {
                max_buffers_per_class: capacity,
                pitch_alignment: 4,
            })
            .unwrap();
            let sizes = [
                FrameSize::new(16, 16),
                FrameSize::new(32, 8),
                FrameSize::new(7, 5),
            ];
            let layout = FrameLayout::top_down(format);
            let mut held: [Vec<_>; 3] = [Vec::new(), Vec::new(), Vec::new()];

            for (acquire, class) in ops {
                if acquire {
                    if let Some(frame) = pool.try_acquire(sizes[class], layout) {
                        held[class].push(frame);
                    }
                } else {
                    held[class].pop();
                }
                for (i, size) in sizes.iter().enumerate() {
                    prop_assert_eq!(pool.checked_out(*size), held[i].len());
                    prop_assert!(pool.checked_out(*size) <= capacity);
                    prop_assert!(pool.checked_out(*size) + pool.free_buffers(*size) <= capacity);
                }
            }
        }

        /// Every acquired frame satisfies pitch >= width * bpp, rounded up
        /// to the configured alignment and no further.
        #[test]
        fn acquired_pitch_is_aligned_and_sufficient(
            width in 1u32..500,
            height in 1u32..16,
            alignment in prop::sample::select(vec![1usize, 4, 8, 64]),
            format in arbitrary_format(),
            bottom_up in prop::bool::ANY,
        ) {
            let pool = BufferPool::new(PoolConfig {
                max_buffers_per_class: 1,
                pitch_alignment: alignment,
            })
            .unwrap();
            let layout = FrameLayout::new(format, bottom_up);
            let frame = pool.acquire(FrameSize::new(width, height), layout).unwrap();

            prop_assert!(frame.pitch() >= format.min_pitch(width));
            prop_assert_eq!(frame.pitch() % alignment, 0);
            prop_assert!(frame.pitch() < format.min_pitch(width) + alignment);
            prop_assert_eq!(frame.pixels().len(), frame.pitch() * height as usize);
            prop_assert_eq!(frame.layout(), layout);
        }
    }
}
