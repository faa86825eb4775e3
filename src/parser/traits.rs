//! Config reader trait definition

use std::path::{Path, PathBuf};

use crate::parser::types::ModuleCallRecord;

/// Trait for reading module calls out of a configuration tree
pub trait Parser: Send + Sync {
    /// Read every module call declared in the configuration at `path`
    fn read_dir(&self, path: &Path) -> Result<Vec<ModuleCallRecord>, ParseError>;

    /// Parse the content of a single file and extract its module calls
    fn parse(&self, content: &str, file: &Path) -> Result<Vec<ModuleCallRecord>, ParseError>;
}

/// Error type for config reading operations
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to read a file or directory
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the file structure
    #[error("Failed to parse {path:?}: {message}")]
    ParseFailed { path: PathBuf, message: String },

    /// Tree-sitter related error
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),
}

impl ParseError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        ParseError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
