//! Background render loop.
//!
//! ```text
//!  Stopped ──start()──► Running ──stop() + join──► Stopped
//! ```
//!
//! While running, the loop repaints the whole store as fast as the surface
//! hands out targets. Pacing comes from the surface itself (vsync / buffer
//! locking); the loop adds no throttling of its own.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use duet_core::PathStore;

use crate::surface::{Canvas, DrawingSurface, TargetGuard};
use crate::RenderError;

/// Result of painting a single frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameStats {
    /// Number of paths painted.
    pub path_count: usize,
    /// Number of vertices across all painted paths.
    pub vertex_count: usize,
}

/// Loop statistics snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_painted: u64,
    /// Frames skipped because no target was available.
    pub frames_skipped: u64,
    pub paint_errors: u64,
    pub last_frame_paths: usize,
}

/// Counters updated by the render thread without taking a lock.
#[derive(Default)]
struct AtomicRenderStats {
    frames_painted: AtomicU64,
    frames_skipped: AtomicU64,
    paint_errors: AtomicU64,
    last_frame_paths: AtomicUsize,
}

impl AtomicRenderStats {
    fn snapshot(&self) -> RenderStats {
        RenderStats {
            frames_painted: self.frames_painted.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            paint_errors: self.paint_errors.load(Ordering::Relaxed),
            last_frame_paths: self.last_frame_paths.load(Ordering::Relaxed),
        }
    }
}

/// Paint every path currently in `store` onto one target from `surface`.
///
/// The target is released when this returns, whether painting succeeded,
/// failed, or panicked.
pub fn render_frame<S: DrawingSurface>(
    surface: &S,
    store: &PathStore,
) -> Result<FrameStats, RenderError> {
    let mut target = TargetGuard::acquire(surface)?;
    let paths = store.snapshot();

    target.clear()?;
    let mut vertex_count = 0;
    for path in &paths {
        target.draw_path(path)?;
        vertex_count += path.len();
    }

    Ok(FrameStats {
        path_count: paths.len(),
        vertex_count,
    })
}

/// Handle to the render thread.
///
/// Dropping a running loop stops it and waits for the thread to exit.
pub struct RenderLoop {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<AtomicRenderStats>,
}

impl RenderLoop {
    /// Spawn the render thread (surface became available).
    pub fn start<S: DrawingSurface>(surface: Arc<S>, store: PathStore) -> Result<Self, RenderError> {
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(AtomicRenderStats::default());

        let handle = thread::Builder::new().name("duet-render".into()).spawn({
            let running = running.clone();
            let stats = stats.clone();
            move || run(&*surface, &store, &running, &stats)
        })?;

        log::info!("Render loop started");
        Ok(Self {
            running,
            handle: Some(handle),
            stats,
        })
    }

    /// Whether the render thread is still alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop and block until the render thread has exited.
    ///
    /// After this returns no drawing target is held by the loop, so the
    /// surface may be destroyed. Calling `stop` again is a no-op.
    pub fn stop(&mut self) -> Result<(), RenderError> {
        self.running.store(false, Ordering::Release);

        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        // `join` only returns once the thread is gone; it has no spurious
        // wake-ups to retry on.
        match handle.join() {
            Ok(()) => {
                let stats = self.stats.snapshot();
                log::info!(
                    "Render loop stopped after {} frames ({} skipped)",
                    stats.frames_painted,
                    stats.frames_skipped
                );
                Ok(())
            }
            Err(_) => {
                log::error!("Render thread panicked");
                Err(RenderError::LoopPanicked)
            }
        }
    }

    pub fn stats(&self) -> RenderStats {
        self.stats.snapshot()
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.stop();
        }
    }
}

fn run<S: DrawingSurface>(
    surface: &S,
    store: &PathStore,
    running: &AtomicBool,
    stats: &AtomicRenderStats,
) {
    while running.load(Ordering::Acquire) {
        match render_frame(surface, store) {
            Ok(frame) => {
                let painted = stats.frames_painted.fetch_add(1, Ordering::Relaxed) + 1;
                stats.last_frame_paths.store(frame.path_count, Ordering::Relaxed);
                if painted % 300 == 0 {
                    log::debug!(
                        "Frame {painted}: {} paths, {} vertices",
                        frame.path_count,
                        frame.vertex_count
                    );
                }
            }
            Err(RenderError::TargetUnavailable) => {
                log::trace!("Drawing target unavailable, skipping frame");
                stats.frames_skipped.fetch_add(1, Ordering::Relaxed);
                thread::yield_now();
            }
            Err(e) => {
                let errors = stats.paint_errors.fetch_add(1, Ordering::Relaxed) + 1;
                if errors == 1 || errors % 300 == 0 {
                    log::error!("Render error ({errors} so far): {e}");
                }
                thread::yield_now();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_core::{PathStyle, Point, Provenance, RenderablePath};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCanvas {
        drawn: Vec<usize>,
        fail_on: Option<usize>,
    }

    impl crate::Canvas for RecordingCanvas {
        fn draw_path(&mut self, path: &RenderablePath) -> Result<(), RenderError> {
            if self.fail_on == Some(self.drawn.len()) {
                return Err(RenderError::Paint("out of ink".into()));
            }
            self.drawn.push(path.len());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSurface {
        fail_on: Option<usize>,
        frames: Mutex<Vec<Vec<usize>>>,
        acquired: AtomicUsize,
    }

    impl DrawingSurface for RecordingSurface {
        type Target = RecordingCanvas;

        fn acquire(&self) -> Result<RecordingCanvas, RenderError> {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(RecordingCanvas {
                drawn: Vec::new(),
                fail_on: self.fail_on,
            })
        }

        fn release(&self, target: RecordingCanvas) {
            self.frames.lock().unwrap().push(target.drawn);
        }
    }

    fn store_with(lengths: &[usize]) -> PathStore {
        let store = PathStore::new();
        let style = Arc::new(PathStyle::local_default());
        for &n in lengths {
            let mut path = RenderablePath::new(Point::new(0.0, 0.0), style.clone(), Provenance::Local);
            for i in 1..n {
                path.line_to(Point::new(i as f32, 0.0));
            }
            store.push(path);
        }
        store
    }

    #[test]
    fn test_render_frame_paints_every_path() {
        let surface = RecordingSurface::default();
        let store = store_with(&[2, 5, 3]);

        let frame = render_frame(&surface, &store).unwrap();
        assert_eq!(frame, FrameStats { path_count: 3, vertex_count: 10 });

        let frames = surface.frames.lock().unwrap();
        assert_eq!(frames.as_slice(), &[vec![2, 5, 3]]);
    }

    #[test]
    fn test_paint_error_still_releases() {
        let surface = RecordingSurface {
            fail_on: Some(1),
            ..Default::default()
        };
        let store = store_with(&[2, 5, 3]);

        let result = render_frame(&surface, &store);
        assert!(matches!(result, Err(RenderError::Paint(_))));

        // Target came back with the one path painted before the failure.
        let frames = surface.frames.lock().unwrap();
        assert_eq!(frames.as_slice(), &[vec![2]]);
    }

    #[test]
    fn test_empty_store_frame() {
        let surface = RecordingSurface::default();
        let frame = render_frame(&surface, &PathStore::new()).unwrap();
        assert_eq!(frame.path_count, 0);
        assert_eq!(surface.acquired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let surface = Arc::new(RecordingSurface::default());
        let mut render = RenderLoop::start(surface, store_with(&[1])).unwrap();
        render.stop().unwrap();
        assert!(!render.is_running());
        render.stop().unwrap();
    }

    #[test]
    fn test_paint_errors_are_counted_not_fatal() {
        let surface = Arc::new(RecordingSurface {
            fail_on: Some(0),
            ..Default::default()
        });
        let mut render = RenderLoop::start(surface.clone(), store_with(&[1])).unwrap();
        while render.stats().paint_errors < 3 {
            thread::yield_now();
        }
        assert!(render.is_running());
        render.stop().unwrap();

        let stats = render.stats();
        assert_eq!(stats.frames_painted, 0);
        // Every failed frame still handed its target back.
        assert_eq!(
            surface.frames.lock().unwrap().len() as u64,
            stats.paint_errors
        );
    }
}
