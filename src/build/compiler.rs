//! Compiler collaborator.
//!
//! The compiler is opaque: given a source root it must leave `<name>.js`
//! and `<name>.wasm` (or `<name>_bg.wasm`) in the output directory.

use std::path::Path;
use std::process::Command;

use crate::build::BuildError;
use crate::config::{BuildConfig, BuildMode};

/// One compiler invocation.
#[derive(Debug, Clone, Copy)]
pub struct CompileJob<'a> {
    pub source_root: &'a Path,
    pub out_dir: &'a Path,
    pub out_name: &'a str,
    pub mode: BuildMode,
}

impl CompileJob<'_> {
    /// `$NAME` substitutions for this job.
    pub fn vars(&self) -> [(&'static str, String); 4] {
        [
            ("SOURCE_ROOT", self.source_root.display().to_string()),
            ("OUT_DIR", self.out_dir.display().to_string()),
            ("OUT_NAME", self.out_name.to_string()),
            ("PROFILE", self.mode.profile_flag().to_string()),
        ]
    }
}

/// Produces the binary module and its loader script.
pub trait Compiler: Send + Sync {
    fn compile(&self, job: &CompileJob<'_>) -> Result<(), BuildError>;
}

/// Runs an external command such as `wasm-pack build`.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    argv: Vec<String>,
}

impl CommandCompiler {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(config.compiler.clone())
    }
}

impl Compiler for CommandCompiler {
    fn compile(&self, job: &CompileJob<'_>) -> Result<(), BuildError> {
        let resolved = resolve_args(&self.argv, &job.vars());
        let Some((program, args)) = resolved.split_first() else {
            return Err(BuildError::CompilerSpawn {
                program: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty compiler command"),
            });
        };

        tracing::info!(command = %resolved.join(" "), "Running compiler");

        let output = Command::new(program)
            .args(args)
            .current_dir(job.source_root)
            .output()
            .map_err(|source| BuildError::CompilerSpawn {
                program: program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::debug!(program = %program, output = %stdout.trim(), "Compiler output");
        }

        if !output.status.success() {
            let status = match output.status.code() {
                Some(code) => format!("exit code {code}"),
                None => "signal".to_string(),
            };
            return Err(BuildError::CompilerFailed {
                program: program.clone(),
                status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Replace `$KEY` occurrences in each argument.
pub fn resolve_args(args: &[String], vars: &[(&str, String)]) -> Vec<String> {
    args.iter()
        .map(|arg| {
            let mut result = arg.clone();
            for (key, value) in vars {
                result = result.replace(&format!("${key}"), value);
            }
            result
        })
        .collect()
}
