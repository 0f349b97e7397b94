//! Sample → path conversion.
//!
//! Every conversion reads the viewport at call time. A stroke received
//! from a peer with a different aspect ratio is stretched to fit ours;
//! that distortion is accepted.

use std::sync::{Arc, OnceLock};

use crate::path::{PathStyle, Provenance, RenderablePath};
use crate::sample::{Point, Sample, Viewport};

/// How a batch of samples attaches to an existing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentJoin {
    /// First sample of the batch is a line-to from the current end point.
    Continue,
    /// First sample of the batch opens a new sub-path (move-to).
    NewSubpath,
}

/// Builds renderable paths and picks their style by provenance.
pub struct PathAssembler {
    viewport: Arc<dyn Viewport>,
    local_style: Arc<PathStyle>,
    remote_template: PathStyle,
    /// Created on the first remote receipt, then shared by every remote path.
    remote_style: OnceLock<Arc<PathStyle>>,
}

impl PathAssembler {
    pub fn new(viewport: Arc<dyn Viewport>, local_style: PathStyle, remote_style: PathStyle) -> Self {
        Self {
            viewport,
            local_style: Arc::new(local_style),
            remote_template: remote_style,
            remote_style: OnceLock::new(),
        }
    }

    /// Normalize a pixel-space point against the current viewport.
    pub fn to_sample(&self, point: Point) -> Sample {
        self.viewport.size().normalize(point)
    }

    /// Denormalize a sample against the current viewport.
    pub fn to_absolute(&self, sample: Sample) -> Point {
        self.viewport.size().denormalize(sample)
    }

    /// Start a path anchored at an absolute point.
    pub fn start_path(&self, first: Point, provenance: Provenance) -> RenderablePath {
        let style = match provenance {
            Provenance::Local => self.local_style.clone(),
            Provenance::Remote => self.remote_style(),
        };
        RenderablePath::new(first, style, provenance)
    }

    /// Add a line-to vertex to an open path.
    pub fn append_segment(&self, path: &mut RenderablePath, next: Point) {
        path.line_to(next);
    }

    /// Build a remote path from a received batch.
    ///
    /// Returns `None` for an empty batch.
    pub fn assemble_remote(&self, samples: &[Sample]) -> Option<RenderablePath> {
        let (first, rest) = samples.split_first()?;
        let mut path = self.start_path(self.to_absolute(*first), Provenance::Remote);
        for s in rest {
            self.append_segment(&mut path, self.to_absolute(*s));
        }
        Some(path)
    }

    /// Append a received batch to an existing remote path.
    pub fn extend_remote(&self, path: &mut RenderablePath, samples: &[Sample], join: SegmentJoin) {
        let Some((first, rest)) = samples.split_first() else {
            return;
        };
        let head = self.to_absolute(*first);
        match join {
            SegmentJoin::Continue => path.line_to(head),
            SegmentJoin::NewSubpath => path.move_to(head),
        }
        for s in rest {
            self.append_segment(path, self.to_absolute(*s));
        }
    }

    pub fn local_style(&self) -> &Arc<PathStyle> {
        &self.local_style
    }

    /// Shared remote style, instantiated on first use.
    pub fn remote_style(&self) -> Arc<PathStyle> {
        self.remote_style
            .get_or_init(|| {
                log::debug!("Instantiating remote stroke style");
                Arc::new(self.remote_template.clone())
            })
            .clone()
    }

    /// Whether any remote path has been assembled yet.
    pub fn has_remote_style(&self) -> bool {
        self.remote_style.get().is_some()
    }
}
