//! Font engine seam: open faces, probe tables, list layout features
//! (made by FontLab https://www.fontlab.com/)

use std::collections::BTreeSet;
use std::fmt::Display;
use std::path::Path;

use read_fonts::types::Tag;

/// Outcome of asking the engine for one face index inside a file.
#[derive(Debug)]
pub enum FaceOpen<F, E> {
    Opened(OpenedFace<F>),
    /// The index is past the last face in the file. Not an error.
    InvalidIndex,
    Failed(E),
}

/// A face the engine opened, with the names the catalog records.
#[derive(Debug, Clone)]
pub struct OpenedFace<F> {
    pub family: String,
    pub style: String,
    pub face: F,
}

/// The capabilities the ingestion pipeline needs from a font parser.
pub trait FontEngine {
    type Face;
    type Error: Display;

    fn open_face(&mut self, path: &Path, index: u32) -> FaceOpen<Self::Face, Self::Error>;

    fn has_table(&self, face: &Self::Face, table: Tag) -> bool;

    /// Feature tags declared by a layout table (`GSUB` or `GPOS`).
    ///
    /// A missing or unreadable table yields an empty set.
    fn layout_feature_tags(&self, face: &Self::Face, table: Tag) -> BTreeSet<Tag>;
}

#[cfg(feature = "fontations")]
pub use fontations::{FontationsEngine, FontationsFace};

#[cfg(feature = "fontations")]
mod fontations {
    use std::collections::BTreeSet;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use log::debug;
    use read_fonts::types::Tag;
    use read_fonts::{FileRef, FontRef, ReadError, TableProvider};
    use skrifa::string::StringId;
    use skrifa::{FontRef as SkrifaFontRef, MetadataProvider};

    use super::{FaceOpen, FontEngine, OpenedFace};
    use crate::error::FaceOpenError;
    use crate::tags::{GPOS, GSUB};

    /// A face inside a loaded file: shared bytes plus the collection index.
    #[derive(Debug, Clone)]
    pub struct FontationsFace {
        data: Arc<[u8]>,
        index: u32,
    }

    impl FontationsFace {
        fn font(&self) -> Result<FontRef<'_>, ReadError> {
            FontRef::from_index(&self.data, self.index)
        }
    }

    /// [`FontEngine`] backed by read-fonts and skrifa.
    ///
    /// Probing indices 0, 1, 2… of one file reads it from disk once; the bytes
    /// of the most recent file are kept until a different path is opened.
    #[derive(Debug, Default)]
    pub struct FontationsEngine {
        loaded: Option<(PathBuf, Arc<[u8]>)>,
    }

    impl FontationsEngine {
        pub fn new() -> Self {
            Self::default()
        }

        fn load(&mut self, path: &Path) -> Result<Arc<[u8]>, FaceOpenError> {
            if let Some((loaded, data)) = &self.loaded {
                if loaded == path {
                    return Ok(Arc::clone(data));
                }
            }

            self.loaded = None;
            debug!("reading {}", path.display());
            let data: Arc<[u8]> = fs::read(path)?.into();
            self.loaded = Some((path.to_path_buf(), Arc::clone(&data)));
            Ok(data)
        }
    }

    impl FontEngine for FontationsEngine {
        type Face = FontationsFace;
        type Error = FaceOpenError;

        fn open_face(&mut self, path: &Path, index: u32) -> FaceOpen<FontationsFace, FaceOpenError> {
            // A file that cannot be read or whose container header is garbage
            // only ever has an index 0 to fail on.
            let data = match self.load(path) {
                Ok(data) => data,
                Err(err) if index == 0 => return FaceOpen::Failed(err),
                Err(_) => return FaceOpen::InvalidIndex,
            };

            let file = match FileRef::new(&data) {
                Ok(file) => file,
                Err(err) if index == 0 => return FaceOpen::Failed(err.into()),
                Err(_) => return FaceOpen::InvalidIndex,
            };

            let opened = match file {
                FileRef::Font(font) if index == 0 => Ok(font),
                FileRef::Font(_) => Err(ReadError::InvalidCollectionIndex(index)),
                FileRef::Collection(collection) => collection.get(index),
            };

            match opened {
                Ok(_) => {}
                Err(ReadError::InvalidCollectionIndex(_)) => return FaceOpen::InvalidIndex,
                Err(err) => return FaceOpen::Failed(err.into()),
            }

            let (family, style) = match SkrifaFontRef::from_index(&data, index) {
                Ok(font) => face_names(&font, path),
                Err(err) => return FaceOpen::Failed(err.into()),
            };

            FaceOpen::Opened(OpenedFace {
                family,
                style,
                face: FontationsFace { data, index },
            })
        }

        fn has_table(&self, face: &FontationsFace, table: Tag) -> bool {
            match face.font() {
                Ok(font) => font
                    .table_directory
                    .table_records()
                    .iter()
                    .any(|rec| rec.tag() == table),
                Err(_) => false,
            }
        }

        fn layout_feature_tags(&self, face: &FontationsFace, table: Tag) -> BTreeSet<Tag> {
            let mut tags = BTreeSet::new();
            let Ok(font) = face.font() else {
                return tags;
            };

            if table == GSUB {
                if let Ok(gsub) = font.gsub() {
                    if let Ok(list) = gsub.feature_list() {
                        tags.extend(list.feature_records().iter().map(|rec| rec.feature_tag()));
                    }
                }
            } else if table == GPOS {
                if let Ok(gpos) = font.gpos() {
                    if let Ok(list) = gpos.feature_list() {
                        tags.extend(list.feature_records().iter().map(|rec| rec.feature_tag()));
                    }
                }
            }

            tags
        }
    }

    fn face_names(font: &SkrifaFontRef, path: &Path) -> (String, String) {
        let family = first_name(font, &[StringId::FAMILY_NAME, StringId::TYPOGRAPHIC_FAMILY_NAME])
            .unwrap_or_else(|| {
                path.file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string())
            });
        let style = first_name(
            font,
            &[StringId::SUBFAMILY_NAME, StringId::TYPOGRAPHIC_SUBFAMILY_NAME],
        )
        .unwrap_or_else(|| "Regular".to_string());

        (family, style)
    }

    fn first_name(font: &SkrifaFontRef, ids: &[StringId]) -> Option<String> {
        ids.iter().find_map(|id| {
            font.localized_strings(*id)
                .english_or_first()
                .map(|s| s.to_string().trim().to_string())
                .filter(|s| !s.is_empty())
        })
    }

}
