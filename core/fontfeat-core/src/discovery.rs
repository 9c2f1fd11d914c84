//! Font discovery for fontfeat-core (made by FontLab https://www.fontlab.com/)

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::IngestError;

/// Recognised font-container extensions, compared case-insensitively.
pub const FONT_EXTENSIONS: [&str; 4] = ["ttf", "otf", "ttc", "otc"];

/// Recursive filesystem walker over an ordered list of roots.
#[derive(Debug, Clone)]
pub struct PathDiscovery {
    roots: Vec<PathBuf>,
    follow_symlinks: bool,
}

impl PathDiscovery {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let roots = roots.into_iter().map(Into::into).collect();
        Self {
            roots,
            follow_symlinks: false,
        }
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Start the walk. The returned sequence is consumed exactly once.
    ///
    /// Roots are visited in the order given; a path string reachable from two
    /// roots is yielded twice. An unreadable root or subdirectory surfaces as
    /// an `Err` item and the caller is expected to stop there.
    pub fn walk(self) -> FontPaths {
        let follow = self.follow_symlinks;
        let walkers = self
            .roots
            .into_iter()
            .map(move |root| WalkDir::new(root).follow_links(follow).into_iter());

        FontPaths {
            inner: Box::new(walkers.flatten()),
        }
    }
}

/// Lazy stream of candidate font files produced by [`PathDiscovery::walk`].
pub struct FontPaths {
    inner: Box<dyn Iterator<Item = walkdir::Result<walkdir::DirEntry>>>,
}

impl Iterator for FontPaths {
    type Item = Result<PathBuf, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(entry) => {
                    if is_font(entry.path()) && is_regular_file(&entry) {
                        return Some(Ok(entry.into_path()));
                    }
                }
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_default();
                    return Some(Err(IngestError::DirectoryRead { path, source: err }));
                }
            }
        }
    }
}

/// Regular files, including symlinks that resolve to one. `follow_symlinks`
/// only decides whether linked directories are descended.
fn is_regular_file(entry: &DirEntry) -> bool {
    if entry.file_type().is_file() {
        return true;
    }
    entry.path_is_symlink()
        && fs::metadata(entry.path())
            .map(|meta| meta.is_file())
            .unwrap_or(false)
}

pub(crate) fn is_font(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return false,
    };

    FONT_EXTENSIONS.contains(&ext.as_str())
}
