//! Tileset error types

use std::io;
use thiserror::Error;

/// Errors from tileset bookkeeping and persistence.
///
/// Rendering never fails; only resource management and loading do.
#[derive(Error, Debug)]
pub enum TilesetError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("brush '{brush}' references unknown pixmap '{pixmap}'")]
    UnresolvedBrush { brush: String, pixmap: String },

    #[error("{kind} '{name}' is in use ({nrefs} references)")]
    InUse {
        kind: &'static str,
        name: String,
        nrefs: u32,
    },

    #[error("{kind} '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },

    #[error("no such {0}")]
    NoSuchItem(&'static str),

    #[error("invalid surface data for '{0}'")]
    InvalidSurface(String),
}

pub type Result<T> = std::result::Result<T, TilesetError>;

impl From<TilesetError> for String {
    fn from(err: TilesetError) -> Self {
        err.to_string()
    }
}
