//! One-shot compilation of every source under a root.

use std::path::Path;

use walkdir::WalkDir;

use crate::compiler::{CompileResult, CompilerAdapter};

use super::worker::compile_to_disk;

/// Compile every recognized source below `root` once, in path order.
///
/// Partials (names starting with `_`) are skipped; they are only meaningful
/// when imported.
pub fn build_all(root: &Path, adapter: &CompilerAdapter) -> Vec<CompileResult> {
    let convention = adapter.convention();

    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(target: "pipeline", "skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| convention.is_source(entry.path()))
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('_'))
        .map(|entry| compile_to_disk(adapter, entry.path()))
        .collect()
}
