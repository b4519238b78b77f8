//! Error types for epubmd operations.

use thiserror::Error;

/// Errors that abort a conversion.
///
/// Degraded conditions (a missing chapter file, an unreadable NCX, an
/// unresolvable cover) never surface here; they are logged and skipped.
#[derive(Error, Debug)]
pub enum Error {
    #[error("archive is not a valid zip container: {0}")]
    ArchiveCorrupt(#[source] zip::result::ZipError),

    #[error("resource not found in archive: {0}")]
    ResourceNotFound(String),

    #[error("invalid container (META-INF/container.xml): {reason}")]
    InvalidContainer { reason: String },

    #[error("package document not found: {0}")]
    PackageNotFound(String),

    #[error("invalid package document {path}: {reason}")]
    InvalidPackage { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl Error {
    pub(crate) fn invalid_container(reason: impl Into<String>) -> Self {
        Error::InvalidContainer {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_package(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidPackage {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
