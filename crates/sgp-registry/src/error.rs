use std::path::PathBuf;

use thiserror::Error;

use crate::record::FileFormat;

/// Errors produced by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The base or override descriptor could not be read or parsed.
    #[error("malformed descriptor {path}: {reason}")]
    DescriptorParse { path: String, reason: String },

    /// A token in the path has no matching child.
    #[error("unknown name token {token} for name {path}")]
    UnknownToken { token: String, path: String },

    /// Every token matched, but the terminal node carries no location.
    #[error("incomplete file tokens: {path}")]
    IncompleteTokenPath { path: String },

    /// A version was requested for a leaf that declares no versions.
    #[error("{path} declares no versions")]
    MissingVersionMap { path: String },

    /// The requested version id is not declared by the leaf.
    #[error("{path} version {version} was not found")]
    UnknownVersion { path: String, version: u32 },

    /// The leaf's format does not implement the operation.
    #[error("{format} files do not support {operation}")]
    UnsupportedOperation {
        format: FileFormat,
        operation: &'static str,
    },

    /// `load`/`save` on a leaf that declares no format.
    #[error("{path} declares no file format")]
    MissingFormat { path: String },

    /// A multi-record save was handed the wrong number of elements.
    #[error("expected {expected} records, got {actual}")]
    RecordCountMismatch { expected: usize, actual: usize },

    /// File contents could not be decoded in the declared format.
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// A value could not be encoded for writing.
    #[error("failed to encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    /// I/O error from the underlying filesystem, passed through unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    pub(crate) fn descriptor(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::DescriptorParse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
