//! Normalized coordinate samples and the per-gesture stroke buffer.
//!
//! Captured geometry is stored relative to the viewport (`[0, 1]` on both
//! axes) so that two devices with different resolutions can exchange
//! strokes. Conversion back to pixels always uses the *current* viewport.

use std::sync::{PoisonError, RwLock};

/// Absolute point in viewport pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One normalized (x, y) coordinate pair.
///
/// Both components are clamped into `[0, 1]` on construction and the
/// value is immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    x: f32,
    y: f32,
}

impl Sample {
    /// Create a sample, clamping each component into `[0, 1]`.
    ///
    /// Non-finite components collapse to `0.0`.
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: unit(x),
            y: unit(y),
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }
}

fn unit(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    pub width: f32,
    pub height: f32,
}

impl ViewportSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Convert a pixel-space point into a normalized sample.
    ///
    /// A zero-sized axis yields `0.0` for that component.
    pub fn normalize(&self, point: Point) -> Sample {
        Sample::new(ratio(point.x, self.width), ratio(point.y, self.height))
    }

    /// Convert a normalized sample back into pixel space.
    pub fn denormalize(&self, sample: Sample) -> Point {
        Point::new(sample.x * self.width, sample.y * self.height)
    }
}

fn ratio(v: f32, extent: f32) -> f32 {
    if extent > 0.0 {
        v / extent
    } else {
        0.0
    }
}

/// Source of the current viewport size.
///
/// Queried on every normalization and every remote assembly, so a resize
/// takes effect on the next sample.
pub trait Viewport: Send + Sync {
    fn size(&self) -> ViewportSize;
}

impl Viewport for ViewportSize {
    fn size(&self) -> ViewportSize {
        *self
    }
}

/// Viewport that can be resized from one thread and read from others.
#[derive(Debug)]
pub struct SharedViewport {
    size: RwLock<ViewportSize>,
}

impl SharedViewport {
    pub fn new(size: ViewportSize) -> Self {
        Self {
            size: RwLock::new(size),
        }
    }

    /// Update the dimensions (on surface resize).
    pub fn resize(&self, width: f32, height: f32) {
        let mut size = self.size.write().unwrap_or_else(PoisonError::into_inner);
        *size = ViewportSize::new(width, height);
    }
}

impl Viewport for SharedViewport {
    fn size(&self) -> ViewportSize {
        *self.size.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ordered samples of the local stroke that have not been sent yet.
///
/// Owned by the stroke synchronizer; never shared across strokes.
#[derive(Debug, Clone, Default)]
pub struct StrokeBuffer {
    samples: Vec<Sample>,
}

impl StrokeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Move the pending samples out, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<Sample> {
        std::mem::take(&mut self.samples)
    }
}
