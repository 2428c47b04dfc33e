use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error while accessing the hierarchy store")]
    Io(#[from] io::Error),
    #[error("unsupported store version {found:?}, expected {expected:?}")]
    UnsupportedVersion {
        found: String,
        expected: &'static str,
    },
    #[error("corrupt hierarchy store: {0}")]
    Corrupt(String),
}
