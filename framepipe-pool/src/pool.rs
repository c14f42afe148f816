//! Frame buffer pool: bookkeeping, blocking acquisition, recycling.
//!
//! One [`BufferPool`] serves one producer session. All bookkeeping lives
//! behind a single mutex that is held only for bookkeeping — never across
//! the caller's fill or the encoder's encode step — with a condvar for
//! waiters. Recycling a buffer and acquiring it again are both performed
//! under that mutex, so a recycle always happens-before the reuse it
//! enables: the pool never hands out a buffer whose return is still in
//! flight.

use crate::config::PoolConfig;
use framepipe_common::FrameSize;
use framepipe_pixelbuffer::{FrameBuffer, FrameLayout, FrameMetadata};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors surfaced by pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Backing storage for a new buffer could not be reserved.
    #[error("buffer allocation failed: {0}")]
    Allocation(String),

    /// A bounded acquire timed out waiting for a recycle.
    #[error("timed out after {0:?} waiting for a free buffer")]
    Timeout(Duration),

    /// Invalid pool configuration.
    #[error("pool configuration error: {0}")]
    Config(String),
}

/// Bookkeeping for one (width, height) size class.
#[derive(Default)]
struct SizeClass {
    free: VecDeque<FrameBuffer>,
    checked_out: usize,
    /// Next FIFO ticket to hand to an acquirer of this class.
    next_ticket: u64,
    /// Ticket currently allowed to take a buffer.
    now_serving: u64,
    /// Tickets whose holders gave up (timed out) before being served.
    abandoned: HashSet<u64>,
}

impl SizeClass {
    fn total(&self) -> usize {
        self.free.len() + self.checked_out
    }

    /// Advance `now_serving` past the ticket just served and any tickets
    /// that were abandoned while queued.
    fn advance(&mut self) {
        self.now_serving += 1;
        while self.abandoned.remove(&self.now_serving) {
            self.now_serving += 1;
        }
    }

    fn waiters(&self) -> u64 {
        self.next_ticket - self.now_serving
    }
}

struct PoolInner {
    classes: HashMap<FrameSize, SizeClass>,
}

/// Bounded pool of reusable frame buffers, keyed by exact frame size.
///
/// Buffers are recycled, not freed, for the pool's lifetime; size classes
/// are never evicted, so a short-lived resize pays its allocation cost once
/// rather than per frame.
pub struct BufferPool {
    config: PoolConfig,
    inner: Mutex<PoolInner>,
    recycled: Condvar,
    next_id: AtomicU64,
}

impl BufferPool {
    /// Create an empty pool.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Config` when the configuration is invalid.
    pub fn new(config: PoolConfig) -> Result<Arc<Self>, PoolError> {
        config.validate()?;
        tracing::debug!(
            max_buffers_per_class = config.max_buffers_per_class,
            pitch_alignment = config.pitch_alignment,
            "creating buffer pool"
        );
        Ok(Arc::new(Self {
            config,
            inner: Mutex::new(PoolInner {
                classes: HashMap::new(),
            }),
            recycled: Condvar::new(),
            next_id: AtomicU64::new(1),
        }))
    }

    /// Acquire a writable buffer for `size`, labeled per `layout`.
    ///
    /// Reuses a free buffer of the exact size when one exists; grows the
    /// size class while it is under its capacity bound; otherwise **blocks
    /// the calling thread** until a checkout of the same size is recycled.
    /// Waiters of one size class are served in FIFO order.
    ///
    /// A checkout must always be returned — by submitting it or by dropping
    /// the guard — or every later acquire of this size class will block
    /// forever once the class is at capacity. The pool cannot detect or
    /// break that deadlock; return frames promptly.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Allocation` when the class may grow but the
    /// backing storage cannot be reserved.
    pub fn acquire(
        self: &Arc<Self>,
        size: FrameSize,
        layout: FrameLayout,
    ) -> Result<PooledFrame, PoolError> {
        self.acquire_inner(size, layout, None)
    }

    /// Like [`BufferPool::acquire`], but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Timeout` when no buffer became available in
    /// time, or `PoolError::Allocation` as for `acquire`.
    pub fn acquire_timeout(
        self: &Arc<Self>,
        size: FrameSize,
        layout: FrameLayout,
        timeout: Duration,
    ) -> Result<PooledFrame, PoolError> {
        self.acquire_inner(size, layout, Some(timeout))
    }

    /// Non-blocking acquire.
    ///
    /// Returns `None` when the class is at capacity with nothing free, when
    /// earlier acquirers are still queued ahead, or when growth fails.
    pub fn try_acquire(self: &Arc<Self>, size: FrameSize, layout: FrameLayout) -> Option<PooledFrame> {
        let pitch = self.config.aligned_pitch(size.width, layout.format);
        let mut inner = self.inner.lock();
        let class = inner.classes.entry(size).or_default();
        if class.waiters() > 0 {
            return None;
        }
        if let Some(mut buf) = class.free.pop_front() {
            class.checked_out += 1;
            drop(inner);
            buf.relabel(pitch, layout);
            return Some(PooledFrame::new(buf, Arc::clone(self)));
        }
        if class.total() < self.config.max_buffers_per_class {
            class.checked_out += 1;
            drop(inner);
            return self.grow(size, pitch, layout).ok();
        }
        None
    }

    fn acquire_inner(
        self: &Arc<Self>,
        size: FrameSize,
        layout: FrameLayout,
        timeout: Option<Duration>,
    ) -> Result<PooledFrame, PoolError> {
        let pitch = self.config.aligned_pitch(size.width, layout.format);
        let deadline = timeout.map(|t| Instant::now() + t);

        let mut inner = self.inner.lock();
        let ticket = {
            let class = inner.classes.entry(size).or_default();
            let ticket = class.next_ticket;
            class.next_ticket += 1;
            ticket
        };

        loop {
            let class = inner
                .classes
                .get_mut(&size)
                .expect("ticketed size class exists");

            if class.now_serving == ticket {
                if let Some(mut buf) = class.free.pop_front() {
                    class.advance();
                    class.checked_out += 1;
                    drop(inner);
                    self.recycled.notify_all();
                    buf.relabel(pitch, layout);
                    tracing::trace!(%size, id = buf.id(), "reusing pooled buffer");
                    return Ok(PooledFrame::new(buf, Arc::clone(self)));
                }
                if class.total() < self.config.max_buffers_per_class {
                    class.advance();
                    class.checked_out += 1;
                    drop(inner);
                    self.recycled.notify_all();
                    return self.grow(size, pitch, layout);
                }
            }

            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline
                        || self.recycled.wait_until(&mut inner, deadline).timed_out()
                    {
                        let class = inner
                            .classes
                            .get_mut(&size)
                            .expect("ticketed size class exists");
                        if class.now_serving == ticket {
                            class.advance();
                        } else {
                            class.abandoned.insert(ticket);
                        }
                        drop(inner);
                        self.recycled.notify_all();
                        return Err(PoolError::Timeout(timeout.unwrap_or_default()));
                    }
                }
                None => self.recycled.wait(&mut inner),
            }
        }
    }

    /// Allocate a fresh buffer for a class that was found under capacity.
    ///
    /// The caller has already counted the buffer as checked out; a failed
    /// reservation is undone here.
    fn grow(
        self: &Arc<Self>,
        size: FrameSize,
        pitch: usize,
        layout: FrameLayout,
    ) -> Result<PooledFrame, PoolError> {
        let row_capacity = self.config.row_capacity(size.width);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        match FrameBuffer::allocate(id, size, row_capacity) {
            Ok(mut buf) => {
                buf.relabel(pitch, layout);
                tracing::info!(%size, id, row_capacity, "grew buffer pool");
                Ok(PooledFrame::new(buf, Arc::clone(self)))
            }
            Err(e) => {
                let mut inner = self.inner.lock();
                let class = inner
                    .classes
                    .get_mut(&size)
                    .expect("growing size class exists");
                class.checked_out -= 1;
                drop(inner);
                self.recycled.notify_all();
                Err(PoolError::Allocation(e.to_string()))
            }
        }
    }

    /// Return a checkout to the free list and wake waiters.
    ///
    /// Driven by [`PooledFrame`]'s drop; never blocks.
    fn recycle(&self, buf: FrameBuffer) {
        let mut inner = self.inner.lock();
        let class = inner
            .classes
            .get_mut(&buf.size())
            .expect("recycled buffer has a size class");
        class.checked_out -= 1;
        tracing::trace!(size = %buf.size(), id = buf.id(), "recycled buffer");
        class.free.push_back(buf);
        drop(inner);
        self.recycled.notify_all();
    }

    /// Drop every free buffer, keeping checkout bookkeeping intact.
    ///
    /// Returns the number of buffers released. Used at session teardown.
    pub fn drain_free(&self) -> usize {
        let mut inner = self.inner.lock();
        let mut dropped = 0;
        for class in inner.classes.values_mut() {
            dropped += class.free.len();
            class.free.clear();
        }
        drop(inner);
        if dropped > 0 {
            tracing::debug!(dropped, "drained pool free lists");
        }
        // Growth capacity opened up for anyone still waiting
        self.recycled.notify_all();
        dropped
    }

    /// Buffers of `size` currently checked out.
    #[must_use]
    pub fn checked_out(&self, size: FrameSize) -> usize {
        self.inner
            .lock()
            .classes
            .get(&size)
            .map_or(0, |c| c.checked_out)
    }

    /// Free buffers of `size`.
    #[must_use]
    pub fn free_buffers(&self, size: FrameSize) -> usize {
        self.inner
            .lock()
            .classes
            .get(&size)
            .map_or(0, |c| c.free.len())
    }

    /// Acquirers of `size` queued behind the FIFO, including any currently
    /// being served.
    #[must_use]
    pub fn waiters(&self, size: FrameSize) -> u64 {
        self.inner
            .lock()
            .classes
            .get(&size)
            .map_or(0, SizeClass::waiters)
    }

    /// Total buffers across all size classes, free and checked out.
    #[must_use]
    pub fn total_buffers(&self) -> usize {
        self.inner.lock().classes.values().map(SizeClass::total).sum()
    }

    /// Checked-out buffers across all size classes.
    #[must_use]
    pub fn total_checked_out(&self) -> usize {
        self.inner
            .lock()
            .classes
            .values()
            .map(|c| c.checked_out)
            .sum()
    }

    /// The pool's configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

/// A checked-out frame buffer.
///
/// Grants write access to the pixels between acquire and submit. Dropping
/// the guard recycles the buffer into its pool, so the error path can never
/// leak a checkout; the submit path consumes the guard and the buffer is
/// returned on success and failure alike.
pub struct PooledFrame {
    buf: Option<FrameBuffer>,
    pool: Arc<BufferPool>,
}

impl PooledFrame {
    fn new(buf: FrameBuffer, pool: Arc<BufferPool>) -> Self {
        Self {
            buf: Some(buf),
            pool,
        }
    }

    fn frame(&self) -> &FrameBuffer {
        self.buf.as_ref().expect("frame present until drop")
    }

    /// Pool-assigned buffer identity, stable across recycles.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.frame().id()
    }

    /// Frame dimensions.
    #[must_use]
    pub fn size(&self) -> FrameSize {
        self.frame().size()
    }

    /// Frame width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.frame().width()
    }

    /// Frame height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.frame().height()
    }

    /// Bytes per row, including alignment padding.
    #[must_use]
    pub fn pitch(&self) -> usize {
        self.frame().pitch()
    }

    /// The layout negotiated for this checkout.
    #[must_use]
    pub fn layout(&self) -> FrameLayout {
        self.frame().layout()
    }

    /// The checkout's pixel bytes (`pitch * height` of them).
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        self.frame().data()
    }

    /// Writable pixel bytes.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        self.buf
            .as_mut()
            .expect("frame present until drop")
            .data_mut()
    }

    /// Writable pixel bytes of row `y` (memory order).
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        self.buf
            .as_mut()
            .expect("frame present until drop")
            .row_mut(y)
    }

    /// Exact metadata for this checkout, suitable for submit.
    #[must_use]
    pub fn metadata(&self) -> FrameMetadata {
        self.frame().metadata()
    }

    /// True when this frame was acquired from `pool`.
    #[must_use]
    pub fn belongs_to(&self, pool: &Arc<BufferPool>) -> bool {
        Arc::ptr_eq(&self.pool, pool)
    }
}

impl fmt::Debug for PooledFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.frame();
        f.debug_struct("PooledFrame")
            .field("id", &frame.id())
            .field("size", &frame.size())
            .field("pitch", &frame.pitch())
            .field("layout", &frame.layout())
            .finish()
    }
}

impl Drop for PooledFrame {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.recycle(buf);
        }
    }
}
