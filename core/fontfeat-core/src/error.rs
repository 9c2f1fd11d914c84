//! Error types for fontfeat-core (made by FontLab https://www.fontlab.com/)

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the catalog store.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("no batch is open on the catalog")]
    NotBatching,

    #[error("a batch is already open on the catalog")]
    BatchInProgress,

    #[error("catalog connection already closed")]
    Closed,

    #[error("features for {filename}#{face_index} written without a fresh catalog entry")]
    FeaturesWithoutEntry { filename: String, face_index: u32 },

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("catalog io: {0}")]
    Io(#[from] io::Error),
}

/// Fatal conditions that abort an ingestion run.
///
/// Per-face trouble (faces that fail to open, duplicate keys) never shows up
/// here; it is logged and counted in the run summary instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("cannot read directory {}: {source}", path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl IngestError {
    /// True when the run was refused because the catalog file already exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, IngestError::Catalog(CatalogError::AlreadyExists(_)))
    }
}

/// Why a face index could not be opened.
#[derive(Debug, Error)]
pub enum FaceOpenError {
    #[error("reading font file: {0}")]
    Io(#[from] io::Error),

    #[error("parsing font: {0}")]
    Read(#[from] read_fonts::ReadError),
}
