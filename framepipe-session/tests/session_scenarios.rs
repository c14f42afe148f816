//! End-to-end scenarios for the acquire/fill/submit handoff.

use crossbeam_channel as channel;
use framepipe_session::{
    Config, DisplayTarget, ErrorKind, FrameEncoder, FrameLayout, FrameMetadata, PixelFormat,
    ProducerSession,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Test double for the compressor backend.
///
/// Accepts any target whose display name starts with ':', hands out a
/// fixed layout, and records every encoded frame's metadata.
struct FakeEncoder {
    layout: Mutex<FrameLayout>,
    reject_next_encode: AtomicBool,
    encoded: Mutex<Vec<FrameMetadata>>,
}

impl FakeEncoder {
    fn new(layout: FrameLayout) -> Arc<Self> {
        Arc::new(Self {
            layout: Mutex::new(layout),
            reject_next_encode: AtomicBool::new(false),
            encoded: Mutex::new(Vec::new()),
        })
    }

    fn rgba() -> Arc<Self> {
        Self::new(FrameLayout::top_down(PixelFormat::Rgba))
    }

    fn set_layout(&self, layout: FrameLayout) {
        *self.layout.lock() = layout;
    }

    fn encoded(&self) -> Vec<FrameMetadata> {
        self.encoded.lock().clone()
    }
}

impl FrameEncoder for FakeEncoder {
    fn probe(&self, target: &DisplayTarget) -> anyhow::Result<()> {
        if target.display.starts_with(':') {
            Ok(())
        } else {
            anyhow::bail!("{} is not a remote-display surface", target.display)
        }
    }

    fn frame_layout(&self, _width: u32, _height: u32) -> FrameLayout {
        *self.layout.lock()
    }

    fn encode(&self, pixels: &[u8], metadata: &FrameMetadata) -> anyhow::Result<()> {
        assert_eq!(pixels.len(), metadata.byte_len());
        if self.reject_next_encode.swap(false, Ordering::SeqCst) {
            anyhow::bail!("compressor rejected the frame");
        }
        self.encoded.lock().push(*metadata);
        Ok(())
    }
}

fn session_with(encoder: Arc<FakeEncoder>, capacity: usize) -> ProducerSession {
    let config = Config::builder().pool_capacity(capacity).build().unwrap();
    ProducerSession::init(DisplayTarget::new(":0", 0x77), encoder, config).unwrap()
}

#[test]
fn fullhd_round_trip() {
    let encoder = FakeEncoder::rgba();
    let session = session_with(Arc::clone(&encoder), 2);

    let mut frame = session.acquire(1920, 1080).unwrap();
    assert!(frame.pitch() >= 1920 * 4);
    assert_eq!(frame.layout().format, PixelFormat::Rgba);
    frame.row_mut(0).fill(0x7f);

    let meta = frame.metadata();
    session.submit(frame, meta).unwrap();

    let encoded = encoder.encoded();
    assert_eq!(encoded.len(), 1);
    assert_eq!(encoded[0], meta);
    assert_eq!(session.last_error(), "");
    assert_eq!(session.pool().total_checked_out(), 0);
}

#[test]
fn second_acquire_blocks_until_first_submit() {
    let encoder = FakeEncoder::rgba();
    let session = Arc::new(session_with(encoder, 1));

    let first = session.acquire(1920, 1080).unwrap();
    let first_id = first.id();

    let (got_tx, got_rx) = channel::bounded(1);
    let waiter = {
        let session = Arc::clone(&session);
        thread::spawn(move || {
            let frame = session.acquire(1920, 1080).unwrap();
            got_tx.send(frame.id()).unwrap();
        })
    };

    // The second acquire cannot complete before the first submit
    assert!(got_rx.recv_timeout(Duration::from_millis(50)).is_err());

    let meta = first.metadata();
    session.submit(first, meta).unwrap();

    // ... and then it returns the same physical buffer, recycled
    let reused = got_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(reused, first_id);
    waiter.join().unwrap();
}

#[test]
fn mismatched_submit_fails_and_still_recycles() {
    let encoder = FakeEncoder::rgba();
    let session = session_with(Arc::clone(&encoder), 1);

    let frame = session.acquire(640, 480).unwrap();
    let mut meta = frame.metadata();
    meta.width = 639;

    let err = session.submit(frame, meta).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(session.last_error_kind(), Some(ErrorKind::Validation));
    assert!(session.last_error().contains("639x480"));
    assert!(encoder.encoded().is_empty());

    // The buffer went back to the pool despite the failure: with capacity
    // 1, this acquire would block forever on a leak.
    let frame = session.acquire(640, 480).unwrap();
    let meta = frame.metadata();
    session.submit(frame, meta).unwrap();
}

#[test]
fn undersized_pitch_fails_validation() {
    let session = session_with(FakeEncoder::rgba(), 1);

    let frame = session.acquire(100, 50).unwrap();
    let mut meta = frame.metadata();
    meta.pitch = 100 * 4 - 1;

    let err = session.submit(frame, meta).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(session.last_error().contains("pitch"));
}

#[test]
fn oversized_pitch_fails_validation() {
    let session = session_with(FakeEncoder::rgba(), 1);

    let frame = session.acquire(100, 50).unwrap();
    let mut meta = frame.metadata();
    meta.pitch = frame.pitch() + 4;

    let err = session.submit(frame, meta).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(session.last_error().contains("overruns"));
}

#[test]
fn init_rejects_non_capable_target() {
    let err = ProducerSession::init(
        DisplayTarget::new("headless", 0),
        FakeEncoder::rgba(),
        Config::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Initialization);
    assert!(err.is_fatal());
    assert!(err.to_string().contains("not a remote-display surface"));
}

#[test]
fn encode_failure_recycles_and_session_stays_usable() {
    let encoder = FakeEncoder::rgba();
    let session = session_with(Arc::clone(&encoder), 1);

    encoder.reject_next_encode.store(true, Ordering::SeqCst);
    let frame = session.acquire(320, 200).unwrap();
    let meta = frame.metadata();
    let err = session.submit(frame, meta).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encode);
    assert_eq!(session.last_error_kind(), Some(ErrorKind::Encode));

    // Pool state survived the failure
    let frame = session.acquire(320, 200).unwrap();
    let meta = frame.metadata();
    session.submit(frame, meta).unwrap();
    assert_eq!(encoder.encoded().len(), 1);
}

#[test]
fn cross_session_frame_is_rejected() {
    let session_a = session_with(FakeEncoder::rgba(), 1);
    let session_b = session_with(FakeEncoder::rgba(), 1);

    let frame = session_a.acquire(64, 64).unwrap();
    let meta = frame.metadata();
    let err = session_b.submit(frame, meta).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(session_b.last_error().contains("not acquired from this session"));

    // The stray frame was recycled into its own pool
    assert_eq!(session_a.pool().total_checked_out(), 0);
    assert!(session_a.acquire(64, 64).is_ok());
}

#[test]
fn zero_sized_acquire_is_rejected() {
    let session = session_with(FakeEncoder::rgba(), 1);
    let err = session.acquire(0, 1080).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn bounded_acquire_times_out_as_allocation_failure() {
    let encoder = FakeEncoder::rgba();
    let config = Config::builder()
        .pool_capacity(1)
        .acquire_timeout(Duration::from_millis(20))
        .build()
        .unwrap();
    let session =
        ProducerSession::init(DisplayTarget::new(":0", 1), encoder, config).unwrap();

    let _held = session.acquire(800, 600).unwrap();
    let err = session.acquire(800, 600).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Allocation);
    assert_eq!(session.last_error_kind(), Some(ErrorKind::Allocation));
    assert!(session.last_error().contains("timed out"));
}

#[test]
fn layout_renegotiated_on_every_acquire() {
    let encoder = FakeEncoder::rgba();
    let session = session_with(Arc::clone(&encoder), 1);

    let frame = session.acquire(100, 100).unwrap();
    let id = frame.id();
    assert_eq!(frame.layout().format, PixelFormat::Rgba);
    let meta = frame.metadata();
    session.submit(frame, meta).unwrap();

    // The backend switches format mid-session; the recycled buffer is
    // relabeled, not reallocated
    encoder.set_layout(FrameLayout::new(PixelFormat::Bgr, true));
    let frame = session.acquire(100, 100).unwrap();
    assert_eq!(frame.id(), id);
    assert_eq!(frame.layout().format, PixelFormat::Bgr);
    assert!(frame.layout().bottom_up);
    assert_eq!(frame.pitch(), 100 * 3);
    let meta = frame.metadata();
    session.submit(frame, meta).unwrap();

    let formats: Vec<PixelFormat> = encoder.encoded().iter().map(|m| m.format).collect();
    assert_eq!(formats, vec![PixelFormat::Rgba, PixelFormat::Bgr]);
}

#[test]
fn close_lifecycle() {
    let session = session_with(FakeEncoder::rgba(), 1);

    // Close with a frame checked out is refused and the session stays usable
    let frame = session.acquire(64, 64).unwrap();
    let err = session.close().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(session.is_ready());

    let meta = frame.metadata();
    session.submit(frame, meta).unwrap();
    session.close().unwrap();
    assert!(!session.is_ready());

    // Everything after teardown is an error, but errors stay queryable
    assert_eq!(
        session.acquire(64, 64).unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(session.close().unwrap_err().kind(), ErrorKind::Validation);
    assert!(session.last_error().contains("torn-down"));
}
