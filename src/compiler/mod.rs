//! Compiler adapter.
//!
//! Wraps a third-party stylesheet compiler behind [`StyleCompiler`] and turns
//! every outcome, including library panics, into a [`CompileResult`]. Writing
//! the output is left to the caller.

mod error;
mod sass;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use error::CompileError;
pub use sass::GrassCompiler;

use crate::config::Settings;
use crate::convention::FileConvention;

/// The opaque source-to-target translation.
pub trait StyleCompiler: Send + Sync {
    /// Compiler name for logging.
    fn name(&self) -> &str;

    /// Translate the file at `source` into target stylesheet text.
    fn translate(&self, source: &Path) -> Result<String, CompileError>;
}

/// Outcome of one compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Success { output: Vec<u8> },
    Failure { detail: String },
}

/// Result of compiling one source file. Produced once per triggered compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub outcome: CompileOutcome,
}

impl CompileResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CompileOutcome::Success { .. })
    }

    pub fn output_bytes(&self) -> Option<&[u8]> {
        match &self.outcome {
            CompileOutcome::Success { output } => Some(output),
            CompileOutcome::Failure { .. } => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.outcome {
            CompileOutcome::Failure { detail } => Some(detail),
            CompileOutcome::Success { .. } => None,
        }
    }

    fn failure(source: &Path, output: PathBuf, error: CompileError) -> Self {
        Self {
            source_path: source.to_path_buf(),
            output_path: output,
            outcome: CompileOutcome::Failure {
                detail: error.to_string(),
            },
        }
    }
}

/// Source path in, [`CompileResult`] out. Cheap to clone.
#[derive(Clone)]
pub struct CompilerAdapter {
    compiler: Arc<dyn StyleCompiler>,
    convention: FileConvention,
}

impl std::fmt::Debug for CompilerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilerAdapter")
            .field("compiler", &self.compiler.name())
            .field("convention", &self.convention)
            .finish()
    }
}

impl CompilerAdapter {
    pub fn new(compiler: Arc<dyn StyleCompiler>, convention: FileConvention) -> Self {
        Self {
            compiler,
            convention,
        }
    }

    /// Adapter using [`GrassCompiler`] configured from `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(GrassCompiler::new(settings.compiler.style)),
            settings.watch.convention(),
        )
    }

    pub fn convention(&self) -> &FileConvention {
        &self.convention
    }

    /// Compile `source`. Never fails and never panics; errors are returned as data.
    pub fn compile(&self, source: &Path) -> CompileResult {
        let output_path = self.convention.output_path(source);

        if !self.convention.is_source(source) {
            let error = CompileError::UnsupportedExtension {
                path: source.to_path_buf(),
            };
            return CompileResult::failure(source, output_path, error);
        }

        let translated = catch_unwind(AssertUnwindSafe(|| self.compiler.translate(source)));
        match translated {
            Ok(Ok(css)) => CompileResult {
                source_path: source.to_path_buf(),
                output_path,
                outcome: CompileOutcome::Success {
                    output: css.into_bytes(),
                },
            },
            Ok(Err(error)) => CompileResult::failure(source, output_path, error),
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                let error = CompileError::Panicked {
                    path: source.to_path_buf(),
                    detail,
                };
                CompileResult::failure(source, output_path, error)
            }
        }
    }
}
