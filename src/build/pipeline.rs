//! Build pipeline: stage, compile, verify, publish.
//!
//! # Responsibilities
//! - Produce each build in its own generation directory
//! - Collect exactly `<name>.js` and `<name>.wasm` from the compiler
//! - Publish to the `AssetStore` and repoint the output symlink
//! - Remove generation directories left over from earlier runs
//!
//! # Layout
//! ```text
//! <parent>/dist                      → symlink to the current generation
//! <parent>/.dist-builds/<uuid>/      generation directories
//! <parent>/.dist-builds/.scratch-<uuid>/  compiler output, removed after collection
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use uuid::Uuid;

use crate::assets::{AssetStore, AssetTree};
use crate::build::compiler::{CommandCompiler, CompileJob, Compiler};
use crate::build::copy::copy_tree;
use crate::build::{absolute, BuildError};
use crate::config::{BuildConfig, BuildMode, ServerConfig};
use crate::observability::metrics;

const SCRATCH_PREFIX: &str = ".scratch-";

/// Builds asset trees and publishes them.
pub struct BuildPipeline {
    config: BuildConfig,
    mode: BuildMode,
    static_root: PathBuf,
    builds_dir: PathBuf,
    compiler: Arc<dyn Compiler>,
    store: AssetStore,
    build_lock: Mutex<()>,
}

impl BuildPipeline {
    /// Pipeline running the configured compiler command.
    pub fn new(config: &ServerConfig, store: AssetStore) -> Self {
        let compiler = Arc::new(CommandCompiler::from_config(&config.build));
        Self::with_compiler(config, store, compiler)
    }

    /// Pipeline with a custom compiler.
    ///
    /// Relative paths in `config` are resolved against the working directory
    /// here, once.
    pub fn with_compiler(config: &ServerConfig, store: AssetStore, compiler: Arc<dyn Compiler>) -> Self {
        let mut build = config.build.clone();
        build.source_root = absolute(&build.source_root);
        build.static_dir = absolute(&build.static_dir);
        let static_root = absolute(&config.static_root);

        Self {
            config: build,
            mode: config.mode,
            builds_dir: builds_dir_for(&static_root),
            static_root,
            compiler,
            store,
            build_lock: Mutex::new(()),
        }
    }

    /// Directory holding generation directories.
    pub fn builds_dir(&self) -> &Path {
        &self.builds_dir
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    /// Run one build on the blocking pool.
    pub async fn build_once(self: &Arc<Self>) -> Result<Arc<AssetTree>, BuildError> {
        let pipeline = Arc::clone(self);
        tokio::task::spawn_blocking(move || pipeline.build_blocking()).await?
    }

    /// Run one build on the current thread.
    pub fn build_blocking(&self) -> Result<Arc<AssetTree>, BuildError> {
        let _serial = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let start = Instant::now();
        let id = Uuid::new_v4();
        let staging = self.builds_dir.join(id.to_string());
        let scratch = self.builds_dir.join(format!("{SCRATCH_PREFIX}{id}"));

        tracing::info!(build_id = %id, mode = %self.mode, "Build started");

        let result = self.stage(&staging, &scratch);
        remove_dir_quietly(&scratch);

        match result {
            Ok(()) => {
                let tree = self.store.publish(staging);
                self.link_output(tree.root());
                metrics::record_build("success");
                tracing::info!(
                    build_id = %id,
                    generation = tree.generation(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Build published"
                );
                Ok(tree)
            }
            Err(e) => {
                remove_dir_quietly(&staging);
                metrics::record_build("failure");
                tracing::error!(
                    build_id = %id,
                    error = %e,
                    generation = self.store.generation(),
                    "Build failed, keeping current assets"
                );
                Err(e)
            }
        }
    }

    fn stage(&self, staging: &Path, scratch: &Path) -> Result<(), BuildError> {
        if !self.config.static_dir.is_dir() {
            return Err(BuildError::StaticDirMissing(self.config.static_dir.clone()));
        }
        fs::create_dir_all(scratch)
            .map_err(BuildError::io(format!("creating {}", scratch.display())))?;

        let copied = copy_tree(&self.config.static_dir, staging).map_err(BuildError::io(format!(
            "copying {} to {}",
            self.config.static_dir.display(),
            staging.display()
        )))?;
        tracing::debug!(files = copied, "Static files copied");

        let name = self.config.artifact_name.as_str();
        self.compiler.compile(&CompileJob {
            source_root: &self.config.source_root,
            out_dir: scratch,
            out_name: name,
            mode: self.mode,
        })?;

        collect_artifacts(scratch, staging, name)
    }

    /// Point `static_root` at `target` by renaming a fresh symlink over it.
    #[cfg(unix)]
    fn link_output(&self, target: &Path) {
        use std::os::unix::fs::symlink;

        match fs::symlink_metadata(&self.static_root) {
            Ok(meta) if !meta.file_type().is_symlink() => {
                tracing::warn!(
                    path = %self.static_root.display(),
                    "Output path is not a symlink, leaving it in place"
                );
                return;
            }
            _ => {}
        }

        let Some(relative) = target
            .strip_prefix(parent_of(&self.static_root))
            .ok()
            .map(Path::to_path_buf)
        else {
            return;
        };
        let temp_link = self.builds_dir.join(format!(".link-{}", Uuid::new_v4()));

        let linked = symlink(&relative, &temp_link)
            .and_then(|()| fs::rename(&temp_link, &self.static_root));
        if let Err(e) = linked {
            remove_file_quietly(&temp_link);
            tracing::warn!(
                path = %self.static_root.display(),
                target = %relative.display(),
                error = %e,
                "Failed to repoint output symlink"
            );
        }
    }

    #[cfg(not(unix))]
    fn link_output(&self, _target: &Path) {}

    /// Delete generation directories that nothing points at.
    ///
    /// Returns how many were removed.
    pub fn clean_stale(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.builds_dir) else {
            return 0;
        };
        let keep = fs::read_link(&self.static_root)
            .ok()
            .map(|target| parent_of(&self.static_root).join(target));
        let current = self.store.current();

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if keep.as_deref() == Some(path.as_path()) || path == current.root() {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let result = if is_dir {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove stale build"),
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Removed stale build directories");
        }
        removed
    }
}

/// `<parent>/.<name>-builds` for `static_root = <parent>/<name>`.
pub fn builds_dir_for(static_root: &Path) -> PathBuf {
    let name = static_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dist".to_string());
    parent_of(static_root).join(format!(".{name}-builds"))
}

fn parent_of(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Move the compiler's outputs into `staging` under their published names.
fn collect_artifacts(scratch: &Path, staging: &Path, name: &str) -> Result<(), BuildError> {
    let js = format!("{name}.js");
    let wasm = format!("{name}.wasm");
    let bg_wasm = format!("{name}_bg.wasm");

    let js_source = scratch.join(&js);
    if !js_source.is_file() {
        return Err(BuildError::MissingArtifact(js));
    }

    let wasm_source = [scratch.join(&wasm), scratch.join(&bg_wasm)]
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| BuildError::MissingArtifact(wasm.clone()))?;

    for (source, dest) in [(js_source, staging.join(&js)), (wasm_source, staging.join(&wasm))] {
        fs::copy(&source, &dest).map_err(BuildError::io(format!(
            "copying {} to {}",
            source.display(),
            dest.display()
        )))?;
    }
    Ok(())
}

fn remove_dir_quietly(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove build directory");
        }
    }
}

#[cfg(unix)]
fn remove_file_quietly(path: &Path) {
    let _ = fs::remove_file(path);
}
