//! Atomically swappable asset tree.
//!
//! # Responsibilities
//! - Hold the current immutable `AssetTree`
//! - Hand out per-request snapshots without locking
//! - Swap in a freshly built tree in one step
//! - Delete superseded build directories once no reader holds them
//!
//! # Design Decisions
//! - Readers `load_full()` an `Arc`, so a request keeps its tree alive
//!   even if a rebuild lands mid-request
//! - Only trees created by the build pipeline are ever deleted; a
//!   pre-existing output directory is never touched

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

/// One immutable snapshot of the served files.
#[derive(Debug)]
pub struct AssetTree {
    root: PathBuf,
    generation: u64,
    owned: bool,
}

impl AssetTree {
    /// Directory the snapshot's files live in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build generation. `0` is whatever was on disk at startup.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this tree was produced by a build and may be pruned.
    pub fn is_owned(&self) -> bool {
        self.owned
    }
}

#[derive(Debug)]
struct StoreInner {
    current: ArcSwap<AssetTree>,
    retired: Mutex<Vec<Arc<AssetTree>>>,
    next_generation: AtomicU64,
}

/// Shared handle to the current asset tree.
#[derive(Debug, Clone)]
pub struct AssetStore {
    inner: Arc<StoreInner>,
}

impl AssetStore {
    /// Start out serving an existing directory (generation 0).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let initial = AssetTree {
            root: root.into(),
            generation: 0,
            owned: false,
        };
        Self {
            inner: Arc::new(StoreInner {
                current: ArcSwap::from_pointee(initial),
                retired: Mutex::new(Vec::new()),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// Snapshot of the current tree.
    pub fn current(&self) -> Arc<AssetTree> {
        self.inner.current.load_full()
    }

    /// Generation currently being served.
    pub fn generation(&self) -> u64 {
        self.inner.current.load().generation
    }

    /// Make a completely written build directory the served tree.
    ///
    /// The directory must not be modified afterwards.
    pub fn publish(&self, root: PathBuf) -> Arc<AssetTree> {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let tree = Arc::new(AssetTree {
            root,
            generation,
            owned: true,
        });

        let previous = self.inner.current.swap(Arc::clone(&tree));
        tracing::info!(
            generation,
            previous = previous.generation,
            root = %tree.root.display(),
            "Asset tree published"
        );

        if previous.owned {
            self.inner
                .retired
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(previous);
        }
        self.prune();
        tree
    }

    /// Delete retired build directories nobody is reading from anymore.
    ///
    /// Returns how many directories were removed.
    pub fn prune(&self) -> usize {
        let unreferenced: Vec<Arc<AssetTree>> = {
            let mut retired = self.inner.retired.lock().unwrap_or_else(PoisonError::into_inner);
            let (free, busy): (Vec<_>, Vec<_>) = retired
                .drain(..)
                .partition(|tree| Arc::strong_count(tree) == 1);
            *retired = busy;
            free
        };

        let mut removed = 0;
        for tree in unreferenced {
            match fs::remove_dir_all(&tree.root) {
                Ok(()) => {
                    removed += 1;
                    tracing::debug!(generation = tree.generation, "Retired asset tree removed");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        generation = tree.generation,
                        root = %tree.root.display(),
                        error = %e,
                        "Failed to remove retired asset tree"
                    );
                }
            }
        }
        removed
    }

    /// Number of superseded trees still waiting for readers to finish.
    pub fn retired_count(&self) -> usize {
        self.inner.retired.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_dir(parent: &Path, name: &str, content: &str) -> PathBuf {
        let dir = parent.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("webgame.js"), content).unwrap();
        dir
    }

    #[test]
    fn starts_with_external_tree() {
        let store = AssetStore::new("dist");
        let tree = store.current();
        assert_eq!(tree.root(), Path::new("dist"));
        assert_eq!(tree.generation(), 0);
        assert!(!tree.is_owned());
    }

    #[test]
    fn publish_swaps_current_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let store = AssetStore::new(tmp.path().join("dist"));

        let first = build_dir(tmp.path(), "gen-a", "a");
        store.publish(first.clone());
        assert_eq!(store.generation(), 1);
        assert_eq!(store.current().root(), first.as_path());

        let second = build_dir(tmp.path(), "gen-b", "b");
        store.publish(second.clone());
        assert_eq!(store.generation(), 2);
        assert_eq!(store.current().root(), second.as_path());
    }

    #[test]
    fn in_flight_reader_keeps_old_tree_alive() {
        let tmp = tempfile::tempdir().unwrap();
        let store = AssetStore::new(tmp.path().join("dist"));

        let first = build_dir(tmp.path(), "gen-a", "a");
        store.publish(first.clone());
        let reader = store.current();

        store.publish(build_dir(tmp.path(), "gen-b", "b"));
        assert!(first.exists(), "tree still referenced by a reader");
        assert_eq!(fs::read_to_string(reader.root().join("webgame.js")).unwrap(), "a");
        assert_eq!(store.retired_count(), 1);

        drop(reader);
        assert_eq!(store.prune(), 1);
        assert!(!first.exists());
        assert_eq!(store.retired_count(), 0);
    }

    #[test]
    fn external_tree_is_never_deleted() {
        let tmp = tempfile::tempdir().unwrap();
        let external = build_dir(tmp.path(), "dist", "old");
        let store = AssetStore::new(external.clone());

        store.publish(build_dir(tmp.path(), "gen-a", "a"));
        store.prune();
        assert!(external.join("webgame.js").exists());
        assert_eq!(store.retired_count(), 0);
    }
}
