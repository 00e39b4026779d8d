use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::Flag;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid input path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("'{count}' files found, aborting image search")]
    TooManyFiles { count: usize },
    #[error("'0' image files found in {}", path.display())]
    ZeroFiles { path: PathBuf },
    #[error("No target files found in {}", path.display())]
    NoTargetFiles { path: PathBuf },
    #[error("Failed to read image metadata for {}: {reason}", path.display())]
    Metadata { path: PathBuf, reason: String },
    #[error("Image file not found: {}", path.display())]
    ImageNotFound { path: PathBuf },
    #[error("Error while writing data: {0}")]
    Write(String),
    #[error("Layout error: {0}")]
    Layout(String),
    #[error("No catalog group '{name}' with extension '{extension}'")]
    UnknownEntry { name: String, extension: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Node graph error: {0}")]
    Graph(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used to decide whether a failure is terminal for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input path missing or invalid; nothing scanned.
    Path,
    /// File ceiling reached; scan aborted.
    Capacity,
    /// Nothing to catalog.
    EmptyResult,
    /// One file could not be introspected; recovered by skipping it.
    Metadata,
    /// Catalog artifact could not be written or read back.
    Write,
    /// Geometry for one backdrop or node failed; recovered by skipping it.
    Layout,
    /// Selection names a group the catalog does not have.
    Selection,
    Config,
}

impl ImportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::InvalidPath { .. } => ErrorKind::Path,
            ImportError::TooManyFiles { .. } => ErrorKind::Capacity,
            ImportError::ZeroFiles { .. } | ImportError::NoTargetFiles { .. } => {
                ErrorKind::EmptyResult
            }
            ImportError::Metadata { .. } | ImportError::ImageNotFound { .. } => {
                ErrorKind::Metadata
            }
            ImportError::Write(_) | ImportError::Io(_) | ImportError::Json(_) => ErrorKind::Write,
            ImportError::Layout(_) | ImportError::Graph(_) => ErrorKind::Layout,
            ImportError::UnknownEntry { .. } => ErrorKind::Selection,
            ImportError::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    /// Diagnostics flag this error is reported under.
    pub fn flag(&self) -> Flag {
        match self {
            ImportError::InvalidPath { .. } => Flag::InvalidPathError,
            ImportError::TooManyFiles { .. } => Flag::MaxFileError,
            ImportError::ZeroFiles { .. } => Flag::ZeroFileError,
            ImportError::NoTargetFiles { .. } => Flag::NoTargetFiles,
            ImportError::Metadata { .. } => Flag::MetadataError,
            ImportError::ImageNotFound { .. } => Flag::ImageFileNotFoundError,
            ImportError::Write(_) | ImportError::Io(_) | ImportError::Json(_) => {
                Flag::WriteDataError
            }
            ImportError::Layout(_)
            | ImportError::Graph(_)
            | ImportError::UnknownEntry { .. }
            | ImportError::InvalidConfig(_) => Flag::Info,
        }
    }

    /// True when the run cannot continue past this error.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Metadata | ErrorKind::Layout)
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
