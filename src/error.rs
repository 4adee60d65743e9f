//! Error type shared by every generation step.
//!
//! Validation errors (`InvalidArgument`, `InvalidModel`, `MalformedTree`,
//! `MissingInputFile`, `MissingArtifact`) are always raised before the first
//! byte is written. `FileSystem` and `Io` can surface once writing has begun.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while converting a tree or emitting a test harness.
#[derive(Debug, Error)]
pub enum Error {
    /// A generation parameter (artifact name, feature name, function name...) is unusable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The model is not a binary-split classification tree we can emit.
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    /// A serialized model or scaler path does not exist.
    #[error("Input file not found: {path}")]
    MissingInputFile { path: PathBuf },
    /// The node arrays do not describe a single-rooted acyclic binary tree.
    #[error("Malformed tree: {0}")]
    MalformedTree(String),
    /// Harness generation was requested before the model sources were written.
    #[error("Generated model artifact not found: {path}")]
    MissingArtifact { path: PathBuf },
    /// A directory or file could not be created or opened.
    #[error("Failed to access {path}: {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Failed to format generated source: {0}")]
    Format(#[from] std::fmt::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn file_system(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileSystem {
            path: path.into(),
            source,
        }
    }
}
