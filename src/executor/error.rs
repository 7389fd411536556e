//! Executor error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::dependency::CoordinateError;
use crate::merge::MergeError;
use crate::template::TemplateError;

/// Errors that can occur while executing a recipe.
///
/// The `FileExists`, `Merge(Unsupported)`, and `Template(Undefined)` cases
/// form the recoverable taxonomy: with `show_errors` set they become context
/// warnings instead of aborting the run. Everything else is fatal and stops
/// the remaining instructions.
#[derive(Error, Debug)]
pub enum ExecuteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("template source not found: {0}")]
    MissingSource(PathBuf),

    #[error("{path}: {source}")]
    Template {
        path: PathBuf,
        source: TemplateError,
    },

    #[error("{path}: {source}")]
    Merge { path: PathBuf, source: MergeError },

    #[error(transparent)]
    Coordinate(#[from] CoordinateError),

    #[error("target escapes the output root: {0}")]
    PathEscape(PathBuf),

    #[error("destination directory is not writable: {0}")]
    NotWritable(PathBuf),

    #[error("the following file could not be created since it already exists: {0}")]
    FileExists(PathBuf),

    #[error("source without an extension must be a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("popped past the bottom of the folder stack")]
    FolderStackUnderflow,
}
