//! Source/output file naming.
//!
//! Source files are recognized by extension (case-insensitive) and compile to a
//! sibling file whose extension is replaced by the output extension.

use std::path::{Path, PathBuf};

/// Which files are stylesheet sources and where their output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConvention {
    source_extensions: Vec<String>,
    output_extension: String,
}

impl FileConvention {
    pub fn new<S: AsRef<str>>(source_extensions: &[S], output_extension: &str) -> Self {
        Self {
            source_extensions: source_extensions
                .iter()
                .map(|ext| normalize(ext.as_ref()))
                .collect(),
            output_extension: output_extension.trim_start_matches('.').to_string(),
        }
    }

    /// True if `path` ends in one of the recognized source extensions.
    pub fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(normalize)
            .is_some_and(|ext| self.source_extensions.contains(&ext))
    }

    /// Output path for `source`: same directory, extension replaced.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        source.with_extension(&self.output_extension)
    }

    pub fn source_extensions(&self) -> &[String] {
        &self.source_extensions
    }

    pub fn output_extension(&self) -> &str {
        &self.output_extension
    }
}

impl Default for FileConvention {
    fn default() -> Self {
        Self::new(&["scss", "sass"], "uss")
    }
}

fn normalize(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}
