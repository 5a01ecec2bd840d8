//! Source watcher for rebuild-on-change.
//!
//! # Responsibilities
//! - Watch the source root and static directory recursively
//! - Drop events from build outputs, `target/` and editor temp files
//! - Debounce bursts into a single rebuild
//!
//! # Design Decisions
//! - notify callbacks only forward paths; all work happens in one tokio task
//! - Changes arriving during a build queue up and trigger the next one

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::build::BuildPipeline;

/// Directory names whose contents never trigger a rebuild.
const IGNORED_DIRS: &[&str] = &["target", ".git", "node_modules"];

/// Watches sources and rebuilds through a `BuildPipeline`.
pub struct SourceWatcher {
    roots: Vec<PathBuf>,
    ignored: Vec<PathBuf>,
    debounce: Duration,
}

impl SourceWatcher {
    pub fn new(pipeline: &BuildPipeline) -> Self {
        let config = pipeline.config();
        let mut roots = vec![config.source_root.clone()];
        let static_dir = config.static_dir.clone();
        if !roots.iter().any(|root| static_dir.starts_with(root)) {
            roots.push(static_dir);
        }

        Self {
            roots,
            ignored: vec![pipeline.static_root().to_path_buf(), pipeline.builds_dir().to_path_buf()],
            debounce: Duration::from_millis(config.debounce_ms),
        }
    }

    /// Whether a changed path should be ignored.
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.ignored.iter().any(|ignored| path.starts_with(ignored)) {
            return true;
        }
        let in_ignored_dir = path.components().any(|c| match c {
            Component::Normal(name) => IGNORED_DIRS.iter().any(|d| name == *d),
            _ => false,
        });
        in_ignored_dir || is_temp_file(path)
    }

    /// Start watching. The returned task owns the notify watcher and
    /// runs until `shutdown` fires.
    pub fn spawn(
        self,
        pipeline: Arc<BuildPipeline>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<JoinHandle<()>, notify::Error> {
        let (tx, rx) = mpsc::unbounded_channel();
        let this = Arc::new(self);
        let callback_filter = Arc::clone(&this);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !is_content_change(&event.kind) {
                        return;
                    }
                    for path in event.paths {
                        if !callback_filter.is_ignored(&path) {
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => tracing::error!(error = %e, "Watch error"),
            },
            Config::default(),
        )?;

        for root in &this.roots {
            if root.exists() {
                watcher.watch(root, RecursiveMode::Recursive)?;
                tracing::info!(path = %root.display(), "Watching for changes");
            } else {
                tracing::warn!(path = %root.display(), "Watch root does not exist, skipping");
            }
        }
        tracing::debug!(ignored = ?this.ignored, "Ignoring build output paths");

        let debounce = this.debounce;
        Ok(tokio::spawn(async move {
            let _watcher = watcher;
            rebuild_loop(rx, pipeline, debounce, shutdown).await;
        }))
    }
}

/// Receive changed paths, wait for a quiet period, rebuild.
pub async fn rebuild_loop(
    mut changes: mpsc::UnboundedReceiver<PathBuf>,
    pipeline: Arc<BuildPipeline>,
    debounce: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        let first = tokio::select! {
            _ = shutdown.recv() => break,
            change = changes.recv() => match change {
                Some(path) => path,
                None => break,
            },
        };

        let mut count = 1usize;
        while let Ok(Some(_)) = tokio::time::timeout(debounce, changes.recv()).await {
            count += 1;
        }

        tracing::info!(path = %first.display(), changes = count, "Source change detected, rebuilding");
        if let Err(e) = pipeline.build_once().await {
            tracing::warn!(
                error = %e,
                generation = pipeline.store().generation(),
                "Rebuild failed, still serving last good build"
            );
        }
    }
    tracing::debug!("Source watcher stopped");
}

fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(modify) => !matches!(modify, notify::event::ModifyKind::Metadata(_)),
        _ => false,
    }
}

fn is_temp_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with('~')
        || name.ends_with(".swp")
        || name.ends_with(".swx")
        || name.ends_with(".tmp")
        || name.starts_with(".#")
}
