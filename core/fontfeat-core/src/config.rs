//! Ingestion configuration (made by FontLab https://www.fontlab.com/)

use std::path::PathBuf;

use crate::catalog::DEFAULT_CATALOG_FILENAME;

/// Everything one ingestion run needs to know, passed in explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Directories to scan, in order.
    pub roots: Vec<PathBuf>,
    /// Where the catalog is written; must not exist yet.
    pub catalog_path: PathBuf,
    pub follow_symlinks: bool,
}

impl IngestConfig {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            catalog_path: PathBuf::from(DEFAULT_CATALOG_FILENAME),
            follow_symlinks: false,
        }
    }

    pub fn catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = path.into();
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}
