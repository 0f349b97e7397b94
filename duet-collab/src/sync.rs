//! Stroke synchronizer: the glue between pointer input, the wire and the
//! path store.
//!
//! ## Outgoing
//!
//! ```text
//!  down ──► begin()  new local path + first sample
//!  move ──► extend() append; if encoded buffer ≥ cap → send chunk, clear buffer
//!  up   ──► end()    append; path → PathStore; send remainder (always)
//! ```
//!
//! The visual path is never split: only the pending-to-send buffer resets
//! on a mid-stroke flush. Every sample is sent exactly once, spread over
//! 1..N chunks.
//!
//! ## Incoming
//!
//! `on_payload_received()` decodes a chunk and appends it to the open remote
//! path (or opens one). Malformed payloads are logged and dropped.
//!
//! Local capture and remote assembly sit behind separate locks, so the UI
//! thread and a network callback thread never wait on each other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use duet_core::{
    PathAssembler, PathId, PathStore, Point, Provenance, RenderablePath, Sample, SegmentJoin,
    StrokeBuffer, Viewport,
};

use crate::codec::{ChunkKind, StrokeCodec};
use crate::config::SessionConfig;
use crate::transport::{PayloadHandler, PeerId, Transport, TransportError};

/// Synchronizer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub strokes_completed: u64,
    pub chunks_sent: u64,
    /// Chunks lost to encode or transport errors (including "no peer").
    pub chunks_lost: u64,
    pub payloads_received: u64,
    pub malformed_payloads: u64,
}

#[derive(Default)]
struct AtomicSyncStats {
    strokes_completed: AtomicU64,
    chunks_sent: AtomicU64,
    chunks_lost: AtomicU64,
    payloads_received: AtomicU64,
    malformed_payloads: AtomicU64,
}

impl AtomicSyncStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SyncStats {
        SyncStats {
            strokes_completed: self.strokes_completed.load(Ordering::Relaxed),
            chunks_sent: self.chunks_sent.load(Ordering::Relaxed),
            chunks_lost: self.chunks_lost.load(Ordering::Relaxed),
            payloads_received: self.payloads_received.load(Ordering::Relaxed),
            malformed_payloads: self.malformed_payloads.load(Ordering::Relaxed),
        }
    }
}

/// State of the local gesture in progress.
#[derive(Default)]
struct CaptureState {
    /// Samples not yet sent.
    buffer: StrokeBuffer,
    /// Local path under construction; `None` between gestures.
    path: Option<RenderablePath>,
    /// Chunks flushed so far for this stroke.
    chunks: usize,
}

/// Remote stroke currently receiving chunks.
#[derive(Default)]
struct RemoteState {
    open: Option<PathId>,
}

pub struct StrokeSynchronizer {
    codec: StrokeCodec,
    assembler: PathAssembler,
    store: PathStore,
    transport: Arc<dyn Transport>,
    capture: Mutex<CaptureState>,
    remote: Mutex<RemoteState>,
    stats: AtomicSyncStats,
}

impl StrokeSynchronizer {
    pub fn new(
        config: &SessionConfig,
        viewport: Arc<dyn Viewport>,
        store: PathStore,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            codec: StrokeCodec::new(config.framing),
            assembler: PathAssembler::new(
                viewport,
                config.local_style.clone(),
                config.remote_style.clone(),
            ),
            store,
            transport,
            capture: Mutex::new(CaptureState::default()),
            remote: Mutex::new(RemoteState::default()),
            stats: AtomicSyncStats::default(),
        }
    }

    /// Replace the codec (e.g. a smaller cap for a constrained transport).
    pub fn with_codec(mut self, codec: StrokeCodec) -> Self {
        self.codec = codec;
        self
    }

    fn lock_capture(&self) -> MutexGuard<'_, CaptureState> {
        self.capture.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_remote(&self) -> MutexGuard<'_, RemoteState> {
        self.remote.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Outgoing ──────────────────────────────────────────────────

    /// Pointer down: start a new stroke at `point` (pixels).
    pub fn begin(&self, point: Point) {
        let mut capture = self.lock_capture();
        if capture.path.is_some() {
            log::debug!("begin() while a stroke is open; discarding it");
        }
        capture.path = Some(self.assembler.start_path(point, Provenance::Local));
        capture.buffer.clear();
        capture.buffer.push(self.assembler.to_sample(point));
        capture.chunks = 0;
    }

    /// Pointer move: extend the stroke, flushing a chunk once the pending
    /// samples reach the wire cap.
    pub fn extend(&self, point: Point) {
        let mut capture = self.lock_capture();
        let Some(path) = capture.path.as_mut() else {
            log::debug!("extend() without begin(); ignoring");
            return;
        };
        self.assembler.append_segment(path, point);
        capture.buffer.push(self.assembler.to_sample(point));

        let kind = ChunkKind::for_position(capture.chunks == 0, false);
        if self.codec.exceeds_cap(kind, capture.buffer.as_slice()) {
            self.flush(&mut capture, kind);
        }
    }

    /// Pointer up: finish the stroke, publish it locally and send whatever
    /// is still pending.
    pub fn end(&self, point: Point) {
        let mut capture = self.lock_capture();
        let Some(mut path) = capture.path.take() else {
            log::debug!("end() without begin(); ignoring");
            return;
        };
        self.assembler.append_segment(&mut path, point);
        capture.buffer.push(self.assembler.to_sample(point));
        self.store.push(path);

        let kind = ChunkKind::for_position(capture.chunks == 0, true);
        self.flush(&mut capture, kind);
        capture.chunks = 0;
        AtomicSyncStats::bump(&self.stats.strokes_completed);
    }

    fn flush(&self, capture: &mut CaptureState, kind: ChunkKind) {
        let samples = capture.buffer.take();
        capture.chunks += 1;

        let payload = match self.codec.encode(kind, &samples) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Dropping chunk of {} samples: {e}", samples.len());
                AtomicSyncStats::bump(&self.stats.chunks_lost);
                return;
            }
        };

        let len = payload.len();
        let sent = match self.transport.active_peer() {
            Some(peer) => self.transport.send(peer, payload),
            None => Err(TransportError::NoPeer),
        };

        match sent {
            Ok(()) => {
                AtomicSyncStats::bump(&self.stats.chunks_sent);
                log::debug!("Sent {kind:?} chunk: {} samples, {len} bytes", samples.len());
            }
            Err(TransportError::NoPeer) => {
                AtomicSyncStats::bump(&self.stats.chunks_lost);
                log::debug!("No peer connected; {} samples not shared", samples.len());
            }
            Err(e) => {
                AtomicSyncStats::bump(&self.stats.chunks_lost);
                log::warn!("Chunk of {} samples lost: {e}", samples.len());
            }
        }
    }

    // ── Incoming ──────────────────────────────────────────────────

    /// Handle one payload from the peer. Never panics on bad input.
    pub fn on_payload_received(&self, bytes: &[u8]) {
        AtomicSyncStats::bump(&self.stats.payloads_received);

        let chunk = match self.codec.decode(bytes) {
            Ok(chunk) => chunk,
            Err(e) => {
                AtomicSyncStats::bump(&self.stats.malformed_payloads);
                log::warn!("Dropping payload of {} bytes: {e}", bytes.len());
                return;
            }
        };
        if chunk.samples.is_empty() {
            log::debug!("Ignoring empty chunk");
            return;
        }

        let mut remote = self.lock_remote();
        match chunk.kind {
            None => self.apply_legacy(&mut remote, &chunk.samples),
            Some(kind) => self.apply_marked(&mut remote, kind, &chunk.samples),
        }
    }

    /// Legacy framing: each batch is a new sub-path on the open remote path.
    fn apply_legacy(&self, remote: &mut RemoteState, samples: &[Sample]) {
        // The legacy path never closes. While a render snapshot still holds
        // it, `extend` clones it through `Arc::make_mut`, so each batch costs
        // O(remote vertices so far).
        if let Some(id) = remote.open {
            let extended = self.store.extend(id, |path| {
                self.assembler.extend_remote(path, samples, SegmentJoin::NewSubpath)
            });
            if extended {
                return;
            }
        }
        remote.open = self.push_remote(samples);
    }

    /// Marked framing: chunks continue the open stroke until an end marker.
    fn apply_marked(&self, remote: &mut RemoteState, kind: ChunkKind, samples: &[Sample]) {
        let extended = match remote.open {
            Some(id) if !kind.opens_stroke() => self.store.extend(id, |path| {
                self.assembler.extend_remote(path, samples, SegmentJoin::Continue)
            }),
            _ => false,
        };

        if !extended {
            if !kind.opens_stroke() {
                log::debug!("{kind:?} chunk with no open remote stroke; starting a new one");
            }
            remote.open = self.push_remote(samples);
        }

        if kind.closes_stroke() {
            remote.open = None;
        }
    }

    fn push_remote(&self, samples: &[Sample]) -> Option<PathId> {
        self.assembler
            .assemble_remote(samples)
            .map(|path| self.store.push(path))
    }

    // ── Session ───────────────────────────────────────────────────

    /// Forget every path and any half-received or half-drawn stroke.
    pub fn reset_session(&self) {
        *self.lock_capture() = CaptureState::default();
        self.lock_remote().open = None;
        self.store.clear();
    }

    /// Whether a local gesture is in progress.
    pub fn is_drawing(&self) -> bool {
        self.lock_capture().path.is_some()
    }

    pub fn store(&self) -> &PathStore {
        &self.store
    }

    pub fn codec(&self) -> &StrokeCodec {
        &self.codec
    }

    pub fn stats(&self) -> SyncStats {
        self.stats.snapshot()
    }
}

impl PayloadHandler for StrokeSynchronizer {
    fn on_payload(&self, from: PeerId, payload: &[u8]) {
        log::trace!("{} bytes from {from}", payload.len());
        self.on_payload_received(payload);
    }
}
