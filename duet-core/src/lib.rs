//! # duet-core: Shared canvas model for Duet
//!
//! Geometry and shared state used by both sides of a two-peer drawing
//! session. Nothing in this crate performs I/O.
//!
//! ## Data flow
//!
//! ```text
//!  pointer (px) ──► ViewportSize::normalize ──► Sample ──► StrokeBuffer
//!                                                              │ (wire)
//!  Sample ──► PathAssembler (× current viewport) ──► RenderablePath
//!                                                              │
//!                                                              ▼
//!                                     PathStore ◄──── render loop reads
//! ```
//!
//! ## Modules
//!
//! - [`sample`]: normalized samples, stroke buffer, viewport size
//! - [`path`]: renderable paths and their style
//! - [`assembler`]: sample → path conversion, style selection
//! - [`store`]: thread-shared, append-only path collection

pub mod sample;
pub mod path;
pub mod assembler;
pub mod store;

pub use sample::{Point, Sample, SharedViewport, StrokeBuffer, Viewport, ViewportSize};
pub use path::{
    Color, LineCap, LineJoin, PathStyle, PathVerb, PathVertex, Provenance, RenderablePath,
};
pub use assembler::{PathAssembler, SegmentJoin};
pub use store::{PathId, PathStore};
