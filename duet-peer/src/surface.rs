//! Headless drawing surface: paces frames like a display would and keeps
//! a summary of the last presented frame instead of pixels.

use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use duet_core::{Provenance, RenderablePath};
use duet_render::{Canvas, DrawingSurface, RenderError};

/// What the last presented frame contained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSummary {
    pub local_paths: usize,
    pub remote_paths: usize,
    pub vertices: usize,
}

#[derive(Debug, Default)]
pub struct SummaryCanvas {
    frame: FrameSummary,
}

impl Canvas for SummaryCanvas {
    fn clear(&mut self) -> Result<(), RenderError> {
        self.frame = FrameSummary::default();
        Ok(())
    }

    fn draw_path(&mut self, path: &RenderablePath) -> Result<(), RenderError> {
        match path.provenance() {
            Provenance::Local => self.frame.local_paths += 1,
            Provenance::Remote => self.frame.remote_paths += 1,
        }
        self.frame.vertices += path.len();
        Ok(())
    }
}

pub struct HeadlessSurface {
    frame_interval: Duration,
    next_frame: Mutex<Instant>,
    presented: Mutex<FrameSummary>,
}

impl HeadlessSurface {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            frame_interval,
            next_frame: Mutex::new(Instant::now()),
            presented: Mutex::new(FrameSummary::default()),
        }
    }

    pub fn last_frame(&self) -> FrameSummary {
        *self.presented.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DrawingSurface for HeadlessSurface {
    type Target = SummaryCanvas;

    /// Blocks until the next frame slot, like a vsync-locked swap chain.
    fn acquire(&self) -> Result<SummaryCanvas, RenderError> {
        let wait = {
            let mut next = self.next_frame.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let slot = (*next).max(now);
            *next = slot + self.frame_interval;
            slot - now
        };
        if !wait.is_zero() {
            thread::sleep(wait);
        }
        Ok(SummaryCanvas::default())
    }

    fn release(&self, target: SummaryCanvas) {
        *self.presented.lock().unwrap_or_else(PoisonError::into_inner) = target.frame;
    }
}
