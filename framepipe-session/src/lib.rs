//! Producer-side frame pipeline for a remote-display compressor.
//!
//! This crate is the unit exposed to callers: it binds a display/window to
//! a buffer pool and an error state, and runs the acquire → fill → submit
//! → recycle handoff against an injected encoder backend.
//!
//! # Features
//!
//! - **Pooled frame buffers**: buffers are reused across frames; a steady
//!   producer loop allocates nothing after warmup
//! - **Blocking acquisition**: when a size class is exhausted, acquire
//!   blocks until a frame is submitted, with FIFO fairness per size class
//! - **Per-frame format negotiation**: the encoder chooses pixel format
//!   and row orientation for every buffer handed out
//! - **Leak-free error paths**: submit consumes the checkout, so buffers
//!   return to the pool on validation and encode failures too
//! - **Injected backend**: the compressor is a trait object passed to
//!   init, not a plugin discovered from the environment
//! - **Fail-fast policy**: every failure is recorded on the session and
//!   surfaced to the caller; there are no silent fallbacks
//!
//! # Quick Start
//!
//! ```no_run
//! use framepipe_session::{Config, DisplayTarget, FrameEncoder, ProducerSession};
//! use std::sync::Arc;
//!
//! fn produce(encoder: Arc<dyn FrameEncoder>) -> anyhow::Result<()> {
//!     let config = Config::builder().pool_capacity(2).build()?;
//!     let session = ProducerSession::init(
//!         DisplayTarget::new(":0", 0x2a0_0007),
//!         encoder,
//!         config,
//!     )?;
//!
//!     for _ in 0..60 {
//!         let mut frame = session.acquire(1920, 1080)?;
//!         frame.pixels_mut().fill(0);
//!         let meta = frame.metadata();
//!         session.submit(frame, meta)?;
//!     }
//!
//!     session.close()?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! Failures are categorized by [`ErrorKind`]: initialization failures are
//! fatal (no session exists); allocation, validation and encode failures
//! leave the session ready and the pool uncorrupted. The most recent
//! failure is always queryable via [`ProducerSession::last_error`], which
//! returns an empty string when nothing has failed.
//!
//! # Safety
//!
//! This crate is `#![forbid(unsafe_code)]` and uses only safe Rust.

#![forbid(unsafe_code)]
#![deny(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod config;
pub mod encoder;
pub mod errors;

// Private implementation modules
mod error_state;
mod session;

// Re-exports
pub use config::{AcquireConfig, Config, ConfigBuilder};
pub use encoder::FrameEncoder;
pub use errors::{ErrorKind, SessionError};
pub use session::ProducerSession;

// Re-export the types that cross the session boundary so callers depend on
// one crate.
pub use framepipe_common::{DisplayTarget, FrameSize};
pub use framepipe_pixelbuffer::{FrameLayout, FrameMetadata, PixelFormat, FORMAT_TABLE};
pub use framepipe_pool::{PoolConfig, PooledFrame};
