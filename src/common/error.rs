use std::path::PathBuf;

use thiserror::Error;

/// Storage layer error types
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no page counter registered for file '{0}'")]
    UntrackedFile(String),

    #[error("shutdown failed to close {failed} file handle(s): {source}")]
    ShutdownIncomplete {
        failed: usize,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StorageError>;
