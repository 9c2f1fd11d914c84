//! Layout feature extraction (made by FontLab https://www.fontlab.com/)

use std::collections::BTreeSet;

use read_fonts::types::Tag;

use crate::engine::FontEngine;
use crate::tags::{GDEF, GPOS, GSUB};

/// How a face classified once its layout tables were inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceLayout {
    /// No `GDEF` table; the face was not asked about GSUB/GPOS at all.
    NoLayout,
    /// `GDEF` present, but GSUB and GPOS declare no features between them.
    NoFeatures,
    /// Union of GSUB and GPOS feature tags, never empty.
    Features(BTreeSet<Tag>),
}

impl FaceLayout {
    pub fn has_layout(&self) -> bool {
        !matches!(self, FaceLayout::NoLayout)
    }

    /// Tags to catalog, if the face qualifies for a catalog entry.
    pub fn catalog_tags(&self) -> Option<&BTreeSet<Tag>> {
        match self {
            FaceLayout::Features(tags) => Some(tags),
            _ => None,
        }
    }
}

/// Classify a face and collect its feature tags.
///
/// `GDEF` presence stands in for "carries OpenType layout". A face without it
/// is not inspected further even if it does have GSUB or GPOS tables.
pub fn extract_features<E: FontEngine>(engine: &E, face: &E::Face) -> FaceLayout {
    if !engine.has_table(face, GDEF) {
        return FaceLayout::NoLayout;
    }

    let mut tags = engine.layout_feature_tags(face, GSUB);
    tags.extend(engine.layout_feature_tags(face, GPOS));

    if tags.is_empty() {
        FaceLayout::NoFeatures
    } else {
        FaceLayout::Features(tags)
    }
}
