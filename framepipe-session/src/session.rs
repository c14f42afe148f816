//! The producer session: acquire/fill/submit over one display target.

use crate::config::Config;
use crate::encoder::FrameEncoder;
use crate::error_state::ErrorState;
use crate::errors::{ErrorKind, SessionError};
use framepipe_common::{DisplayTarget, FrameSize};
use framepipe_pixelbuffer::FrameMetadata;
use framepipe_pool::{BufferPool, PooledFrame};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Ready,
    TornDown,
}

/// A producer session bound to one display/window.
///
/// Owns the session's buffer pool and error state, and enforces the
/// acquire → fill → submit → recycle discipline. A session is created with
/// [`ProducerSession::init`] and driven by one producer thread in a loop:
///
/// ```no_run
/// # use framepipe_session::{Config, DisplayTarget, FrameEncoder, ProducerSession};
/// # use std::sync::Arc;
/// # fn run(encoder: Arc<dyn FrameEncoder>) -> Result<(), framepipe_session::SessionError> {
/// let session = ProducerSession::init(
///     DisplayTarget::new(":0", 0x2a0_0007),
///     encoder,
///     Config::default(),
/// )?;
///
/// loop {
///     let mut frame = session.acquire(1920, 1080)?;
///     frame.pixels_mut().fill(0); // render here
///     let meta = frame.metadata();
///     session.submit(frame, meta)?;
/// #   break;
/// }
/// session.close()?;
/// # Ok(())
/// # }
/// ```
///
/// The pool is safe to drive from more than one thread sharing the
/// session, but [`ProducerSession::close`] must not race a blocked
/// [`ProducerSession::acquire`]: a blocked acquire is released only by a
/// recycle (or a configured timeout), never by teardown.
pub struct ProducerSession {
    target: DisplayTarget,
    encoder: Arc<dyn FrameEncoder>,
    pool: Arc<BufferPool>,
    errors: ErrorState,
    state: Mutex<SessionState>,
    acquire_timeout: Option<Duration>,
}

impl std::fmt::Debug for ProducerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerSession")
            .field("target", &self.target)
            .field("state", &self.state)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish_non_exhaustive()
    }
}

impl ProducerSession {
    /// Binds a session to a display/window and starts its buffer pool.
    ///
    /// The encoder collaborator is asked to probe the target; a rejected
    /// target means no session exists at all — there is no partial or
    /// faulted session value to mis-use.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Initialization` when the configuration is
    /// invalid or the target is not a surface the encoder can drive.
    pub fn init(
        target: DisplayTarget,
        encoder: Arc<dyn FrameEncoder>,
        config: Config,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        if let Err(e) = encoder.probe(&target) {
            tracing::warn!(display = %target, "encoder rejected display target: {e:#}");
            return Err(SessionError::Initialization(format!("{target}: {e:#}")));
        }
        let pool = BufferPool::new(config.pool.clone())?;
        tracing::info!(display = %target, "producer session initialized");
        Ok(Self {
            target,
            encoder,
            pool,
            errors: ErrorState::default(),
            state: Mutex::new(SessionState::Ready),
            acquire_timeout: config.acquire_timeout(),
        })
    }

    /// Acquires a writable frame buffer of the given dimensions.
    ///
    /// The pixel layout (format and row orientation) is negotiated with the
    /// encoder per call and reported on the returned frame; fill pixels
    /// accordingly. May block until a previously acquired frame of the same
    /// size is submitted — submit every acquired frame promptly, or the
    /// next acquire of that size will wait forever once the pool is at
    /// capacity.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` for a zero-sized request or a
    /// torn-down session, and `SessionError::Allocation` when the pool
    /// cannot produce a buffer within its limits (or within the configured
    /// acquire timeout). Either way nothing stays checked out and the
    /// session remains usable.
    pub fn acquire(&self, width: u32, height: u32) -> Result<PooledFrame, SessionError> {
        self.ensure_ready("acquire")?;
        let size = FrameSize::new(width, height);
        if size.is_empty() {
            return Err(self.record(SessionError::Validation(format!(
                "cannot acquire a zero-sized frame ({size})"
            ))));
        }

        let layout = self.encoder.frame_layout(width, height);
        let result = match self.acquire_timeout {
            Some(timeout) => self.pool.acquire_timeout(size, layout, timeout),
            None => self.pool.acquire(size, layout),
        };
        match result {
            Ok(frame) => {
                tracing::trace!(%size, id = frame.id(), format = %layout.format, "acquired frame");
                Ok(frame)
            }
            Err(e) => Err(self.record(SessionError::from(e))),
        }
    }

    /// Validates a filled frame and hands it to the encoder.
    ///
    /// Consumes the checkout, so the buffer is recycled into the pool on
    /// every path — success, validation failure and encode failure alike.
    /// The metadata's format and orientation are passed to the encoder
    /// verbatim; only consistency with the checkout is enforced here:
    /// width and height must match the acquire, and the pitch must cover
    /// `width * bytes_per_pixel` without exceeding the checkout's
    /// allocation.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` on inconsistent metadata and
    /// `SessionError::Encode` when the collaborator rejects the frame. The
    /// session stays usable after either.
    pub fn submit(&self, frame: PooledFrame, meta: FrameMetadata) -> Result<(), SessionError> {
        self.ensure_ready("submit")?;

        if !frame.belongs_to(&self.pool) {
            return Err(self.record(SessionError::Validation(
                "frame was not acquired from this session".to_string(),
            )));
        }
        if meta.size() != frame.size() {
            return Err(self.record(SessionError::Validation(format!(
                "submitted {} against a {} checkout",
                meta.size(),
                frame.size()
            ))));
        }
        let min_pitch = meta.format.min_pitch(meta.width);
        if meta.pitch < min_pitch {
            return Err(self.record(SessionError::Validation(format!(
                "pitch {} below {} ({} pixels of {})",
                meta.pitch, min_pitch, meta.width, meta.format
            ))));
        }
        if meta.byte_len() > frame.pixels().len() {
            return Err(self.record(SessionError::Validation(format!(
                "pitch {} overruns the checkout's {}-byte allocation",
                meta.pitch,
                frame.pixels().len()
            ))));
        }

        // No lock is held across the encode; the pool is only touched again
        // when the frame drops and recycles.
        let pixels = &frame.pixels()[..meta.byte_len()];
        match self.encoder.encode(pixels, &meta) {
            Ok(()) => {
                tracing::trace!(size = %meta.size(), format = %meta.format, "submitted frame");
                Ok(())
            }
            Err(e) => Err(self.record(SessionError::Encode(e))),
        }
    }

    /// Tears the session down.
    ///
    /// Valid only while ready and with no frame checked out; the pool's
    /// free buffers are released and every later operation fails. Must not
    /// be called while another thread is blocked in
    /// [`ProducerSession::acquire`].
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` when a frame is still checked out
    /// (the session stays ready) or when the session is already torn down.
    pub fn close(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        if *state == SessionState::TornDown {
            let err = SessionError::Validation("close on a torn-down session".to_string());
            self.errors.record(&err);
            return Err(err);
        }
        let outstanding = self.pool.total_checked_out();
        if outstanding > 0 {
            drop(state);
            return Err(self.record(SessionError::Validation(format!(
                "close with {outstanding} frame(s) still checked out"
            ))));
        }
        let released = self.pool.drain_free();
        *state = SessionState::TornDown;
        drop(state);
        tracing::info!(display = %self.target, released, "producer session closed");
        Ok(())
    }

    /// Description of the most recent failure, or an empty string if none
    /// has occurred. Valid in every state; never transitions.
    #[must_use]
    pub fn last_error(&self) -> String {
        self.errors.message()
    }

    /// Category of the most recent failure, if any.
    #[must_use]
    pub fn last_error_kind(&self) -> Option<ErrorKind> {
        self.errors.kind()
    }

    /// The display/window this session is bound to.
    #[must_use]
    pub fn target(&self) -> &DisplayTarget {
        &self.target
    }

    /// The session's buffer pool, for introspection.
    #[must_use]
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// True until [`ProducerSession::close`] succeeds.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.state.lock() == SessionState::Ready
    }

    fn ensure_ready(&self, op: &str) -> Result<(), SessionError> {
        match *self.state.lock() {
            SessionState::Ready => Ok(()),
            SessionState::TornDown => Err(self.record(SessionError::Validation(format!(
                "{op} on a torn-down session"
            )))),
        }
    }

    fn record(&self, err: SessionError) -> SessionError {
        self.errors.record(&err);
        err
    }
}
