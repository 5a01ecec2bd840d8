//! Build orchestration subsystem.
//!
//! # Data Flow
//! ```text
//! Source change (watcher.rs, debounced)      Startup
//!             ↘                              ↙
//!              pipeline.rs (build_once)
//!                 → copy.rs (static dir → staging)
//!                 → compiler.rs (source → scratch → staging)
//!                 → verify artifacts
//!                 → AssetStore::publish + repoint output symlink
//! ```
//!
//! # Design Decisions
//! - Every build writes a fresh generation directory; nothing is rebuilt in place
//! - A failed build deletes its own directories and leaves the store untouched
//! - Builds run on the blocking pool, one at a time

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod compiler;
pub mod copy;
pub mod pipeline;
pub mod watcher;

pub use compiler::{CommandCompiler, CompileJob, Compiler};
pub use pipeline::BuildPipeline;
pub use watcher::SourceWatcher;

/// Error type for a single build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("static directory {} does not exist", .0.display())]
    StaticDirMissing(PathBuf),

    #[error("failed to start compiler `{program}`: {source}")]
    CompilerSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("compiler `{program}` exited with {status}: {stderr}")]
    CompilerFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("compiler did not produce `{0}`")]
    MissingArtifact(String),

    #[error("build task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl BuildError {
    /// Wrap an I/O error with what was being attempted.
    pub(crate) fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> BuildError {
        let context = context.into();
        move |source| BuildError::Io { context, source }
    }
}

/// Resolve `path` against the working directory.
///
/// The compiler runs inside the source root, so every path handed to it
/// must already be absolute.
pub(crate) fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
