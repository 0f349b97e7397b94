//! Renderable paths: a polyline in pixel space plus its paint style.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::sample::Point;

/// RGBA color, components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Build from a packed `0xAARRGGBB` value.
    pub fn from_argb(argb: u32) -> Self {
        let channel = |shift: u32| ((argb >> shift) & 0xFF) as f32 / 255.0;
        Self {
            r: channel(16),
            g: channel(8),
            b: channel(0),
            a: channel(24),
        }
    }

    /// Convert to `[r, g, b, a]` for upload to a rasterizer.
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

/// Stroke paint parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStyle {
    pub color: Color,
    pub width: f32,
    pub cap: LineCap,
    pub join: LineJoin,
}

impl PathStyle {
    /// Yellow, 3px, round cap and join.
    pub fn local_default() -> Self {
        Self {
            color: Color::from_argb(0xFFFF_FF00),
            width: 3.0,
            cap: LineCap::Round,
            join: LineJoin::Round,
        }
    }

    /// Magenta, 3px, round cap and join.
    pub fn remote_default() -> Self {
        Self {
            color: Color::from_argb(0xFFFF_00FF),
            width: 3.0,
            cap: LineCap::Round,
            join: LineJoin::Round,
        }
    }
}

/// Who drew a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathVerb {
    MoveTo,
    LineTo,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathVertex {
    pub verb: PathVerb,
    pub point: Point,
}

/// A polyline with at least one vertex; the first vertex is always a
/// move-to.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderablePath {
    vertices: Vec<PathVertex>,
    style: Arc<PathStyle>,
    provenance: Provenance,
}

impl RenderablePath {
    pub fn new(first: Point, style: Arc<PathStyle>, provenance: Provenance) -> Self {
        Self {
            vertices: vec![PathVertex {
                verb: PathVerb::MoveTo,
                point: first,
            }],
            style,
            provenance,
        }
    }

    pub fn line_to(&mut self, point: Point) {
        self.vertices.push(PathVertex {
            verb: PathVerb::LineTo,
            point,
        });
    }

    /// Start a new, disconnected sub-path.
    pub fn move_to(&mut self, point: Point) {
        self.vertices.push(PathVertex {
            verb: PathVerb::MoveTo,
            point,
        });
    }

    pub fn vertices(&self) -> &[PathVertex] {
        &self.vertices
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.vertices.iter().map(|v| v.point)
    }

    pub fn last_point(&self) -> Option<Point> {
        self.vertices.last().map(|v| v.point)
    }

    /// Number of vertices (never zero).
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of disconnected pieces (one per move-to).
    pub fn subpath_count(&self) -> usize {
        self.vertices
            .iter()
            .filter(|v| v.verb == PathVerb::MoveTo)
            .count()
    }

    pub fn style(&self) -> &PathStyle {
        &self.style
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }
}
