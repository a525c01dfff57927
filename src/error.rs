//! Error types for the editing engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for editor operations.
pub type Result<T> = std::result::Result<T, EditorError>;

/// Errors surfaced to the host as user-facing notices.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    /// The operation needs a selection of the given kind.
    #[error("No {0} selected")]
    EmptySelection(&'static str),

    /// An image could not be read for a pixmap or the background.
    #[error("Failed to load image {path}: {source}")]
    AssetLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Clipboard or document text could not be encoded or decoded.
    #[error("Invalid document data: {0}")]
    Document(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(String),
}
