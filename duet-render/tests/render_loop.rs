//! Render loop lifecycle against a surface that tracks outstanding targets.

use duet_core::{PathStore, PathStyle, Point, Provenance, RenderablePath};
use duet_render::{Canvas, DrawingSurface, RenderError, RenderLoop};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct CountingCanvas;

impl Canvas for CountingCanvas {
    fn draw_path(&mut self, path: &RenderablePath) -> Result<(), RenderError> {
        assert!(!path.is_empty(), "painted an empty path");
        Ok(())
    }
}

/// Surface that flips between available and unavailable and counts
/// targets that are currently out.
#[derive(Default)]
struct FlakySurface {
    acquires: AtomicUsize,
    outstanding: AtomicUsize,
    attempts: AtomicUsize,
    max_outstanding: AtomicUsize,
    flaky: AtomicBool,
}

impl DrawingSurface for FlakySurface {
    type Target = CountingCanvas;

    fn acquire(&self) -> Result<CountingCanvas, RenderError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.flaky.load(Ordering::SeqCst) && attempt % 2 == 0 {
            return Err(RenderError::TargetUnavailable);
        }
        self.acquires.fetch_add(1, Ordering::SeqCst);
        let out = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_outstanding.fetch_max(out, Ordering::SeqCst);
        thread::sleep(Duration::from_micros(200));
        Ok(CountingCanvas)
    }

    fn release(&self, _target: CountingCanvas) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

fn seeded_store(count: usize) -> PathStore {
    let store = PathStore::new();
    let style = Arc::new(PathStyle::local_default());
    for i in 0..count {
        let mut path = RenderablePath::new(Point::new(i as f32, 0.0), style.clone(), Provenance::Local);
        path.line_to(Point::new(i as f32, 10.0));
        store.push(path);
    }
    store
}

fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) {
    let start = Instant::now();
    while !cond() {
        assert!(start.elapsed() < deadline, "condition not reached in {deadline:?}");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_stop_waits_for_thread_and_releases_target() {
    let surface = Arc::new(FlakySurface::default());
    let store = seeded_store(25);

    let mut render = RenderLoop::start(surface.clone(), store).unwrap();
    wait_until(Duration::from_secs(5), || render.stats().frames_painted >= 5);
    assert!(render.is_running());

    render.stop().unwrap();
    assert!(!render.is_running());
    assert_eq!(surface.outstanding.load(Ordering::SeqCst), 0);
    assert_eq!(surface.max_outstanding.load(Ordering::SeqCst), 1);

    // Nothing acquires after stop() has returned.
    let after_stop = surface.attempts.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(surface.attempts.load(Ordering::SeqCst), after_stop);
}

#[test]
fn test_unavailable_targets_skip_frames() {
    let surface = Arc::new(FlakySurface::default());
    surface.flaky.store(true, Ordering::SeqCst);

    let mut render = RenderLoop::start(surface.clone(), seeded_store(3)).unwrap();
    wait_until(Duration::from_secs(5), || {
        let stats = render.stats();
        stats.frames_painted >= 3 && stats.frames_skipped >= 3
    });
    render.stop().unwrap();

    let stats = render.stats();
    assert_eq!(stats.paint_errors, 0);
    assert_eq!(stats.last_frame_paths, 3);
    assert_eq!(surface.outstanding.load(Ordering::SeqCst), 0);
}

#[test]
fn test_loop_sees_paths_appended_while_running() {
    let surface = Arc::new(FlakySurface::default());
    let store = seeded_store(1);

    let mut render = RenderLoop::start(surface, store.clone()).unwrap();

    let writer = {
        let store = store.clone();
        thread::spawn(move || {
            let style = Arc::new(PathStyle::remote_default());
            for i in 0..50 {
                let mut path = RenderablePath::new(Point::new(0.0, i as f32), style.clone(), Provenance::Remote);
                path.line_to(Point::new(5.0, i as f32));
                store.push(path);
            }
        })
    };
    writer.join().unwrap();

    wait_until(Duration::from_secs(5), || render.stats().last_frame_paths == 51);
    render.stop().unwrap();
}

#[test]
fn test_drop_stops_loop() {
    let surface = Arc::new(FlakySurface::default());
    {
        let render = RenderLoop::start(surface.clone(), seeded_store(2)).unwrap();
        wait_until(Duration::from_secs(5), || render.stats().frames_painted >= 1);
    }
    let attempts = surface.attempts.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(surface.attempts.load(Ordering::SeqCst), attempts);
    assert_eq!(surface.outstanding.load(Ordering::SeqCst), 0);
}

struct PanickingCanvas;

impl Canvas for PanickingCanvas {
    fn draw_path(&mut self, _path: &RenderablePath) -> Result<(), RenderError> {
        panic!("painter crashed");
    }
}

/// Surface whose canvas panics on the first path.
#[derive(Default)]
struct CrashingSurface {
    outstanding: AtomicUsize,
    acquires: AtomicUsize,
}

impl DrawingSurface for CrashingSurface {
    type Target = PanickingCanvas;

    fn acquire(&self) -> Result<PanickingCanvas, RenderError> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        Ok(PanickingCanvas)
    }

    fn release(&self, _target: PanickingCanvas) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

#[test]
fn test_panicking_painter_reports_and_releases() {
    let surface = Arc::new(CrashingSurface::default());
    let mut render = RenderLoop::start(surface.clone(), seeded_store(2)).unwrap();

    wait_until(Duration::from_secs(5), || !render.is_running());

    assert!(matches!(render.stop(), Err(RenderError::LoopPanicked)));
    assert_eq!(surface.acquires.load(Ordering::SeqCst), 1);
    assert_eq!(surface.outstanding.load(Ordering::SeqCst), 0);

    // Already joined: a second stop has nothing left to report.
    assert!(render.stop().is_ok());
}
