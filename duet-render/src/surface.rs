//! Drawing target abstraction.
//!
//! A [`DrawingSurface`] hands out an exclusive drawing target per frame
//! (`acquire`) and takes it back to present it (`release`). Targets are
//! only ever held through a [`TargetGuard`], which releases on drop, so a
//! failed or panicking paint can never leak one.

use std::ops::{Deref, DerefMut};

use duet_core::RenderablePath;

use crate::RenderError;

/// A locked drawing target for one frame.
pub trait Canvas {
    /// Reset the target before painting.
    fn clear(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    /// Paint one path with its own style.
    fn draw_path(&mut self, path: &RenderablePath) -> Result<(), RenderError>;
}

/// Provider of drawing targets, backed by a window or an off-screen buffer.
pub trait DrawingSurface: Send + Sync + 'static {
    type Target: Canvas;

    /// Lock a target for exclusive drawing.
    ///
    /// `Err(RenderError::TargetUnavailable)` means "try again next frame".
    fn acquire(&self) -> Result<Self::Target, RenderError>;

    /// Unlock and present a target previously returned by `acquire`.
    fn release(&self, target: Self::Target);
}

/// Scoped acquisition of a drawing target.
pub struct TargetGuard<'a, S: DrawingSurface> {
    surface: &'a S,
    target: Option<S::Target>,
}

impl<'a, S: DrawingSurface> TargetGuard<'a, S> {
    pub fn acquire(surface: &'a S) -> Result<Self, RenderError> {
        let target = surface.acquire()?;
        Ok(Self {
            surface,
            target: Some(target),
        })
    }
}

impl<S: DrawingSurface> Deref for TargetGuard<'_, S> {
    type Target = S::Target;

    fn deref(&self) -> &Self::Target {
        // Only `Drop` takes the target.
        self.target.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<S: DrawingSurface> DerefMut for TargetGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.target.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<S: DrawingSurface> Drop for TargetGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            self.surface.release(target);
        }
    }
}
