//! Error types for `migdir`.

use std::path::PathBuf;

use crate::checksum::ChecksumError;

/// Result type for migration directory operations.
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Errors returned by the `migdir` crate.
#[derive(thiserror::Error, Debug)]
pub enum MigrateError {
    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested entry does not exist in the directory.
    #[error("not found: {0}")]
    NotFound(String),

    /// The given path exists but is not a directory.
    #[error("{0:?} is not a dir")]
    NotDirectory(PathBuf),

    /// A checkpoint accessor was called on a non-checkpoint file.
    #[error("not a checkpoint file")]
    NotCheckpoint,

    /// The named checkpoint file is not present in the directory.
    #[error("no checkpoint found")]
    CheckpointNotFound,

    /// The sum file cannot be parsed.
    #[error("checksum file format invalid")]
    ChecksumFormat,

    /// The directory contents diverged from the sum file.
    ///
    /// The payload localizes the first divergence. It is absent when the sum
    /// file's header hash disagrees with its own entries (the file itself is
    /// corrupt, so there is no live entry to point at).
    #[error("checksum mismatch")]
    ChecksumMismatch(Option<Box<ChecksumError>>),

    /// The directory has migration files but no sum file.
    #[error("checksum file not found")]
    ChecksumNotFound,

    /// A version string does not follow the `YYYYMMDDhhmmss` layout.
    #[error("invalid version {value:?}: expected format is {expected}")]
    InvalidVersion {
        /// The rejected version string.
        value: String,
        /// The strftime layout versions must follow.
        expected: &'static str,
    },

    /// Malformed input (directive, plan, archive entry).
    #[error("format error: {0}")]
    Format(String),

    /// Invalid state (operation not allowed in current state).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A formatter template failed to compile.
    #[error("template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    /// A formatter template failed to render.
    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),
}
