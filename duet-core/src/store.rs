//! Thread-shared path collection.
//!
//! Writers (pointer input, network callbacks) append whole paths or extend
//! an open remote path; the render loop reads. Each path is held behind an
//! `Arc`, and extension goes through `Arc::make_mut` inside the write lock,
//! so a reader holding a snapshot keeps the pre-append version and never
//! sees a half-built vertex list.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::path::RenderablePath;

/// Handle to a path inside a [`PathStore`].
///
/// Handles are invalidated by [`PathStore::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathId {
    index: usize,
    epoch: u64,
}

#[derive(Default)]
struct StoreInner {
    paths: Vec<Arc<RenderablePath>>,
    /// Bumped by `clear`, so stale handles are rejected.
    epoch: u64,
    /// Bumped on every mutation.
    version: u64,
}

/// Append-only (per session) set of renderable paths.
///
/// Cheap to clone; all clones share the same storage.
#[derive(Clone, Default)]
pub struct PathStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl PathStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A writer that panicked mid-append cannot leave a partial path behind
    // (paths are built before insertion), so poisoned guards are safe to reuse.
    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a fully built path.
    pub fn push(&self, path: RenderablePath) -> PathId {
        let mut inner = self.write();
        let id = PathId {
            index: inner.paths.len(),
            epoch: inner.epoch,
        };
        inner.paths.push(Arc::new(path));
        inner.version += 1;
        id
    }

    /// Mutate a stored path in place.
    ///
    /// Returns `false` if the handle is stale (store was cleared).
    pub fn extend(&self, id: PathId, f: impl FnOnce(&mut RenderablePath)) -> bool {
        let mut inner = self.write();
        if id.epoch != inner.epoch {
            return false;
        }
        let Some(slot) = inner.paths.get_mut(id.index) else {
            return false;
        };
        f(Arc::make_mut(slot));
        inner.version += 1;
        true
    }

    /// Point-in-time copy of the path list.
    pub fn snapshot(&self) -> Vec<Arc<RenderablePath>> {
        self.read().paths.clone()
    }

    /// Visit every path while holding the read lock.
    pub fn for_each(&self, mut f: impl FnMut(&RenderablePath)) {
        let inner = self.read();
        for path in &inner.paths {
            f(path);
        }
    }

    pub fn get(&self, id: PathId) -> Option<Arc<RenderablePath>> {
        let inner = self.read();
        if id.epoch != inner.epoch {
            return None;
        }
        inner.paths.get(id.index).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().paths.is_empty()
    }

    /// Change counter; differs between two reads iff the store was mutated.
    pub fn version(&self) -> u64 {
        self.read().version
    }

    /// Drop every path (surface torn down).
    pub fn clear(&self) {
        let mut inner = self.write();
        inner.paths.clear();
        inner.epoch += 1;
        inner.version += 1;
        log::debug!("Path store cleared (epoch {})", inner.epoch);
    }
}

impl std::fmt::Debug for PathStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("PathStore")
            .field("paths", &inner.paths.len())
            .field("epoch", &inner.epoch)
            .field("version", &inner.version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{PathStyle, Provenance};
    use crate::sample::Point;
    use std::thread;

    fn path_with(n: usize) -> RenderablePath {
        let style = Arc::new(PathStyle::local_default());
        let mut path = RenderablePath::new(Point::new(0.0, 0.0), style, Provenance::Local);
        for i in 1..n {
            path.line_to(Point::new(i as f32, i as f32));
        }
        path
    }

    #[test]
    fn test_push_and_get() {
        let store = PathStore::new();
        assert!(store.is_empty());

        let id = store.push(path_with(3));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap().len(), 3);
    }

    #[test]
    fn test_extend_is_copy_on_write() {
        let store = PathStore::new();
        let id = store.push(path_with(2));

        let before = store.snapshot();
        assert!(store.extend(id, |p| p.line_to(Point::new(9.0, 9.0))));

        // Reader's snapshot still sees the pre-append state.
        assert_eq!(before[0].len(), 2);
        assert_eq!(store.snapshot()[0].len(), 3);
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let store = PathStore::new();
        let id = store.push(path_with(1));
        store.clear();

        assert!(store.is_empty());
        assert!(!store.extend(id, |p| p.line_to(Point::new(1.0, 1.0))));
        assert!(store.get(id).is_none());

        // New handle at the same index is valid.
        let fresh = store.push(path_with(1));
        assert_ne!(fresh, id);
        assert!(store.get(fresh).is_some());
    }

    #[test]
    fn test_version_bumps_on_mutation() {
        let store = PathStore::new();
        let v0 = store.version();
        let id = store.push(path_with(1));
        let v1 = store.version();
        store.extend(id, |p| p.line_to(Point::new(2.0, 2.0)));
        let v2 = store.version();
        assert!(v0 < v1 && v1 < v2);
    }

    #[test]
    fn test_concurrent_appends_fully_formed() {
        const WRITERS: usize = 8;
        const PER_WRITER: usize = 250;
        const VERTICES: usize = 16;

        let store = PathStore::new();

        let reader_store = store.clone();
        let reader = thread::spawn(move || {
            let mut observed = 0;
            while observed < WRITERS * PER_WRITER {
                reader_store.for_each(|p| {
                    assert_eq!(p.len(), VERTICES, "reader saw a partial path");
                });
                observed = reader_store.len();
            }
        });

        let writers: Vec<_> = (0..WRITERS)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..PER_WRITER {
                        store.push(path_with(VERTICES));
                    }
                })
            })
            .collect();

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), WRITERS * PER_WRITER);
        assert!(snapshot.iter().all(|p| p.len() == VERTICES));
    }

    #[test]
    fn test_concurrent_extend_and_snapshot() {
        let store = PathStore::new();
        let id = store.push(path_with(1));

        let writer_store = store.clone();
        let writer = thread::spawn(move || {
            for i in 0..1000 {
                writer_store.extend(id, |p| p.line_to(Point::new(i as f32, 0.0)));
            }
        });

        let mut last = 0;
        while last < 1001 {
            let snap = store.snapshot();
            let len = snap[0].len();
            assert!(len >= last, "path shrank from {last} to {len}");
            last = len;
        }
        writer.join().unwrap();
        assert_eq!(store.get(id).unwrap().len(), 1001);
    }
}
