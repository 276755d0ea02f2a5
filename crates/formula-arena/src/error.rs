use std::path::PathBuf;
use thiserror::Error;

/// Failures opening or creating an arena.
///
/// Once an arena exists, running out of space is not an error value: it
/// aborts the writer, since callers have already committed to the mutation.
#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("arena i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not an arena file (magic {found:#018x})")]
    BadMagic { found: u64 },
    #[error("unsupported arena version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("corrupt arena header: {0}")]
    CorruptHeader(String),
    #[error("arena capacity {requested} is below the minimum of {minimum} bytes")]
    CapacityTooSmall { requested: u64, minimum: u64 },
}

pub type Result<T> = std::result::Result<T, ArenaError>;

pub(crate) fn io_error(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> ArenaError {
    let path = path.into();
    move |source| ArenaError::Io { path, source }
}
