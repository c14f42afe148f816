//! The encoder collaborator seam.

use framepipe_common::DisplayTarget;
use framepipe_pixelbuffer::{FrameLayout, FrameMetadata};

/// Interface to the external remote-display compressor.
///
/// The concrete backend is injected into
/// [`ProducerSession::init`](crate::ProducerSession::init) rather than
/// discovered at load time, so the pipeline core carries no environment
/// coupling and tests substitute fakes.
///
/// Implementations must be `Send + Sync`: the session's buffer pool may be
/// driven from more than one thread.
pub trait FrameEncoder: Send + Sync {
    /// Check that `target` identifies a surface this encoder can drive.
    ///
    /// Called once, during session init; a failure here aborts the session
    /// before any pool state exists.
    ///
    /// # Errors
    ///
    /// Any error means the target is not usable; the message becomes the
    /// session's initialization failure description.
    fn probe(&self, target: &DisplayTarget) -> anyhow::Result<()>;

    /// Choose the pixel layout for a frame of the given dimensions.
    ///
    /// Consulted on every acquire, so the negotiated format and row
    /// orientation may vary from frame to frame.
    fn frame_layout(&self, width: u32, height: u32) -> FrameLayout;

    /// Compress and forward one filled frame.
    ///
    /// `pixels` holds exactly `metadata.pitch * metadata.height` bytes laid
    /// out as described; format and orientation arrive verbatim from the
    /// submit call, with no conversion in between.
    ///
    /// # Errors
    ///
    /// An error is recorded as the session's encode failure; the buffer is
    /// recycled either way.
    fn encode(&self, pixels: &[u8], metadata: &FrameMetadata) -> anyhow::Result<()>;
}
