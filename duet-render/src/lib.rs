//! # duet-render
//!
//! Continuous repaint of the shared [`PathStore`](duet_core::PathStore).
//!
//! ## Architecture
//!
//! ```text
//!  PathStore (duet-core)          ◀─── appended by input / network
//!       │ snapshot()
//!       ▼
//!  render_frame()                 ◀─── TargetGuard::acquire(surface)
//!       │                               paint every path
//!       ▼                               release on drop
//!  RenderLoop (dedicated thread)  ◀─── start() / stop() + join
//! ```
//!
//! Rasterization is the backend's job: it implements [`DrawingSurface`]
//! and [`Canvas`]; this crate decides what to paint and when.
//!
//! ## Crate modules
//!
//! - [`surface`]: drawing target traits and the scoped target guard
//! - [`render_loop`]: frame painting and the background loop

pub mod surface;
pub mod render_loop;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing target unavailable")]
    TargetUnavailable,
    #[error("Paint error: {0}")]
    Paint(String),
    #[error("Failed to spawn render thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Render thread panicked")]
    LoopPanicked,
}

// Re-exports for convenience
pub use surface::{Canvas, DrawingSurface, TargetGuard};
pub use render_loop::{render_frame, FrameStats, RenderLoop, RenderStats};
