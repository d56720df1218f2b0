//! SCSS compilation backed by the `grass` crate.

use std::path::Path;

use crate::config::OutputStyle;

use super::{CompileError, StyleCompiler};

/// Production compiler: SCSS source to plain CSS text.
#[derive(Debug, Clone, Default)]
pub struct GrassCompiler {
    style: OutputStyle,
}

impl GrassCompiler {
    pub fn new(style: OutputStyle) -> Self {
        Self { style }
    }

    fn options(&self) -> grass::Options<'static> {
        let style = match self.style {
            OutputStyle::Expanded => grass::OutputStyle::Expanded,
            OutputStyle::Compressed => grass::OutputStyle::Compressed,
        };
        grass::Options::default().style(style)
    }
}

impl StyleCompiler for GrassCompiler {
    fn name(&self) -> &str {
        "grass"
    }

    fn translate(&self, source: &Path) -> Result<String, CompileError> {
        // grass reports IO problems as opaque syntax errors, check up front
        std::fs::metadata(source).map_err(|e| CompileError::Unreadable {
            path: source.to_path_buf(),
            source: e,
        })?;

        grass::from_path(source, &self.options()).map_err(|e| CompileError::Syntax {
            path: source.to_path_buf(),
            detail: e.to_string(),
        })
    }
}
