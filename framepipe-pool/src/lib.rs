//! Bounded, reusable frame buffer pool for the framepipe producer pipeline.
//!
//! The pool owns every frame buffer for its lifetime and recycles them
//! across frames, so a steady acquire/fill/submit loop performs no
//! per-frame allocation after warmup. Buffers are pooled per exact
//! (width, height) size class; acquisition blocks when a class is at
//! capacity with nothing free, and waiters within one class are served in
//! FIFO order.

pub mod config;
pub mod pool;

mod proptest_pool;

pub use config::PoolConfig;
pub use pool::{BufferPool, PoolError, PooledFrame};
